//! Request payloads and their validation.
//!
//! Payloads are deserialized loosely (raw JSON values or query strings) and
//! then validated into typed commands. Clients may send integers as JSON
//! numbers or numeric strings. Cron values are trimmed and lower-cased before
//! validation. Failures name the offending field.

use super::DeletedAtAction;
use crate::errors::CronError;
use serde::Deserialize;
use serde_json::Value;

const MSG_REQUIRED: &str = "Required";
const MSG_STRING_MIN: &str = "String must contain at least 1 character(s)";
const MSG_NAN: &str = "Expected number, received nan";
const MSG_FLOAT: &str = "Expected integer, received float";
const MSG_MIN_1: &str = "Number must be greater than or equal to 1";
const MSG_MIN_0: &str = "Number must be greater than or equal to 0";
const MSG_MAX_1: &str = "Number must be less than or equal to 1";

/// Body of `POST /crons`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateCronRequest {
    pub cron: Option<Value>,
}

impl CreateCronRequest {
    /// Validate into the normalized cron value.
    pub fn validate(&self) -> Result<String, CronError> {
        required_cron(&self.cron)
    }
}

/// Query of `GET /crons/:cron_id`.
#[derive(Debug, Default, Deserialize)]
pub struct GetCronQuery {
    pub cron: Option<String>,
}

impl GetCronQuery {
    /// Normalized lookup value, if one was supplied.
    pub fn validate(&self) -> Result<Option<String>, CronError> {
        optional_cron_str(self.cron.as_deref())
    }
}

/// Query of `GET /crons`.
#[derive(Debug, Default, Deserialize)]
pub struct ListCronsQuery {
    pub offset: Option<String>,
    pub limit: Option<String>,
    pub cron_ids: Option<String>,
}

/// Validated listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    /// Explicit ids; `None` lists every non-deleted row.
    pub ids: Option<Vec<i64>>,
    pub offset: i64,
    /// `None` means unbounded.
    pub limit: Option<i64>,
}

impl ListCronsQuery {
    pub fn validate(&self) -> Result<ListFilter, CronError> {
        let offset = match self.offset.as_deref() {
            Some(raw) => non_negative("offset", parse_int_str("offset", raw)?)?,
            None => 0,
        };

        let limit = match self.limit.as_deref() {
            Some(raw) => Some(non_negative("limit", parse_int_str("limit", raw)?)?),
            None => None,
        };

        let ids = match self.cron_ids.as_deref() {
            Some(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(CronError::validation("cron_ids", MSG_STRING_MIN));
                }
                Some(parse_id_list(raw))
            }
            None => None,
        };

        Ok(ListFilter { ids, offset, limit })
    }
}

/// Body of `PUT /crons/:cron_id`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCronRequest {
    pub cron: Option<Value>,
    pub status: Option<Value>,
    pub deleted_at: Option<Value>,
}

/// Validated partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CronUpdate {
    pub cron: Option<String>,
    pub status: Option<i16>,
    pub deleted_at: Option<DeletedAtAction>,
}

impl UpdateCronRequest {
    pub fn validate(&self) -> Result<CronUpdate, CronError> {
        Ok(CronUpdate {
            cron: optional_cron(&self.cron)?,
            status: flag("status", &self.status)?.map(|s| s as i16),
            deleted_at: flag("deleted_at", &self.deleted_at)?.and_then(DeletedAtAction::from_flag),
        })
    }
}

/// Body of `PUT /crons`.
#[derive(Debug, Default, Deserialize)]
pub struct BatchUpdateRequest {
    pub cron_ids: Option<Value>,
    pub status: Option<Value>,
    pub deleted_at: Option<Value>,
}

/// Validated batch update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchUpdate {
    pub ids: Vec<i64>,
    pub status: Option<i16>,
    pub deleted_at: Option<DeletedAtAction>,
}

impl BatchUpdateRequest {
    pub fn validate(&self) -> Result<BatchUpdate, CronError> {
        let ids = id_array("cron_ids", &self.cron_ids)?
            .ok_or_else(|| CronError::validation("cron_ids", MSG_REQUIRED))?;

        Ok(BatchUpdate {
            ids,
            status: flag("status", &self.status)?.map(|s| s as i16),
            deleted_at: flag("deleted_at", &self.deleted_at)?.and_then(DeletedAtAction::from_flag),
        })
    }
}

/// Optional body of `DELETE /crons/:cron_id`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteCronRequest {
    pub cron: Option<Value>,
}

impl DeleteCronRequest {
    /// Normalized value to delete by, if one was supplied.
    pub fn validate(&self) -> Result<Option<String>, CronError> {
        optional_cron(&self.cron)
    }
}

/// Optional body of `DELETE /crons`.
#[derive(Debug, Default, Deserialize)]
pub struct BatchDeleteRequest {
    pub cron_ids: Option<Value>,
}

impl BatchDeleteRequest {
    /// Ids to delete; `None` purges every soft-deleted row.
    pub fn validate(&self) -> Result<Option<Vec<i64>>, CronError> {
        id_array("cron_ids", &self.cron_ids)
    }
}

/// Validate the `:cron_id` path segment.
pub fn parse_cron_id(raw: &str) -> Result<i64, CronError> {
    let id = parse_int_str("cron_id", raw)?;
    if id < 1 {
        return Err(CronError::validation("cron_id", MSG_MIN_1));
    }
    Ok(id)
}

/// Trim and lower-case a cron value.
pub fn normalize_cron(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Parse a comma-separated id list, dropping tokens that are not positive integers.
fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|token| token.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .collect()
}

fn required_cron(value: &Option<Value>) -> Result<String, CronError> {
    optional_cron(value)?.ok_or_else(|| CronError::validation("cron", MSG_REQUIRED))
}

fn optional_cron(value: &Option<Value>) -> Result<Option<String>, CronError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => optional_cron_str(Some(s.as_str())),
        Some(other) => Err(CronError::validation(
            "cron",
            format!("Expected string, received {}", type_name(other)),
        )),
    }
}

fn optional_cron_str(value: Option<&str>) -> Result<Option<String>, CronError> {
    match value {
        None => Ok(None),
        Some(raw) => {
            let normalized = normalize_cron(raw);
            if normalized.is_empty() {
                return Err(CronError::validation("cron", MSG_STRING_MIN));
            }
            Ok(Some(normalized))
        }
    }
}

/// Parse an optional 0/1 flag given as number or numeric string.
fn flag(field: &str, value: &Option<Value>) -> Result<Option<i64>, CronError> {
    let Some(n) = optional_int(field, value)? else {
        return Ok(None);
    };

    if n < 0 {
        return Err(CronError::validation(field, MSG_MIN_0));
    }
    if n > 1 {
        return Err(CronError::validation(field, MSG_MAX_1));
    }
    Ok(Some(n))
}

fn optional_int(field: &str, value: &Option<Value>) -> Result<Option<i64>, CronError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match integral(n) {
            Some(i) => Ok(Some(i)),
            None => Err(CronError::validation(field, MSG_FLOAT)),
        },
        Some(Value::String(s)) => parse_int_str(field, s).map(Some),
        Some(other) => Err(CronError::validation(
            field,
            format!("Expected number, received {}", type_name(other)),
        )),
    }
}

/// Parse an optional array of positive ids.
fn id_array(field: &str, value: &Option<Value>) -> Result<Option<Vec<i64>>, CronError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(CronError::validation(
                field,
                format!("Expected array, received {}", type_name(other)),
            ))
        }
    };

    let mut ids = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let path = format!("{}.{}", field, index);
        let id = match item {
            Value::Number(n) => {
                integral(n).ok_or_else(|| CronError::validation(&path, MSG_FLOAT))?
            }
            other => {
                return Err(CronError::validation(
                    &path,
                    format!("Expected number, received {}", type_name(other)),
                ))
            }
        };
        if id < 1 {
            return Err(CronError::validation(&path, MSG_MIN_1));
        }
        ids.push(id);
    }

    Ok(Some(ids))
}

fn parse_int_str(field: &str, raw: &str) -> Result<i64, CronError> {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(i);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => {
            integral_f64(f).ok_or_else(|| CronError::validation(field, MSG_FLOAT))
        }
        _ => Err(CronError::validation(field, MSG_NAN)),
    }
}

/// Integer value of a JSON number, accepting integral floats such as `1.0`.
fn integral(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| n.as_f64().and_then(integral_f64))
}

/// `f` as an `i64` when it has no fractional part and is in range.
fn integral_f64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is out of range.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn non_negative(field: &str, value: i64) -> Result<i64, CronError> {
    if value < 0 {
        return Err(CronError::validation(field, MSG_MIN_0));
    }
    Ok(value)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(err: CronError) -> String {
        err.to_string()
    }

    #[test]
    fn test_create_normalizes_cron() {
        let req = CreateCronRequest {
            cron: Some(json!("  HTTPS://Example.com/Ping  ")),
        };
        assert_eq!(req.validate().unwrap(), "https://example.com/ping");
    }

    #[test]
    fn test_create_missing_cron() {
        let req = CreateCronRequest::default();
        assert_eq!(message(req.validate().unwrap_err()), "\"cron\" is Required");
    }

    #[test]
    fn test_create_blank_cron() {
        let req = CreateCronRequest {
            cron: Some(json!("   ")),
        };
        assert_eq!(
            message(req.validate().unwrap_err()),
            "\"cron\" is String must contain at least 1 character(s)"
        );
    }

    #[test]
    fn test_create_non_string_cron() {
        let req = CreateCronRequest {
            cron: Some(json!(42)),
        };
        assert_eq!(
            message(req.validate().unwrap_err()),
            "\"cron\" is Expected string, received number"
        );
    }

    #[test]
    fn test_parse_cron_id() {
        assert_eq!(parse_cron_id(" 12 ").unwrap(), 12);
        assert_eq!(
            message(parse_cron_id("abc").unwrap_err()),
            "\"cron_id\" is Expected number, received nan"
        );
        assert_eq!(
            message(parse_cron_id("1.5").unwrap_err()),
            "\"cron_id\" is Expected integer, received float"
        );
        assert_eq!(
            message(parse_cron_id("0").unwrap_err()),
            "\"cron_id\" is Number must be greater than or equal to 1"
        );
    }

    #[test]
    fn test_list_filter_drops_non_numeric_ids() {
        let query = ListCronsQuery {
            cron_ids: Some("1,2,x,3".to_string()),
            ..Default::default()
        };

        let filter = query.validate().unwrap();
        assert_eq!(filter.ids, Some(vec![1, 2, 3]));
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.limit, None);
    }

    #[test]
    fn test_list_filter_drops_zero_and_blank_tokens() {
        let query = ListCronsQuery {
            cron_ids: Some("0, 4,,5".to_string()),
            ..Default::default()
        };

        assert_eq!(query.validate().unwrap().ids, Some(vec![4, 5]));
    }

    #[test]
    fn test_list_filter_offset_and_limit() {
        let query = ListCronsQuery {
            offset: Some(" 5".to_string()),
            limit: Some("10".to_string()),
            cron_ids: None,
        };

        let filter = query.validate().unwrap();
        assert_eq!(filter.offset, 5);
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.ids, None);
    }

    #[test]
    fn test_list_filter_rejects_bad_offset() {
        let query = ListCronsQuery {
            offset: Some("ten".to_string()),
            ..Default::default()
        };
        assert_eq!(
            message(query.validate().unwrap_err()),
            "\"offset\" is Expected number, received nan"
        );

        let query = ListCronsQuery {
            limit: Some("-1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            message(query.validate().unwrap_err()),
            "\"limit\" is Number must be greater than or equal to 0"
        );
    }

    #[test]
    fn test_update_accepts_numeric_strings() {
        let req = UpdateCronRequest {
            cron: None,
            status: Some(json!("0")),
            deleted_at: Some(json!(1)),
        };

        let update = req.validate().unwrap();
        assert_eq!(update.cron, None);
        assert_eq!(update.status, Some(0));
        assert_eq!(update.deleted_at, Some(DeletedAtAction::SoftDelete));
    }

    #[test]
    fn test_update_accepts_integral_floats() {
        let req = UpdateCronRequest {
            cron: None,
            status: Some(json!(1.0)),
            deleted_at: Some(json!("0.0")),
        };

        let update = req.validate().unwrap();
        assert_eq!(update.status, Some(1));
        assert_eq!(update.deleted_at, Some(DeletedAtAction::Restore));

        let req = UpdateCronRequest {
            status: Some(json!(0.5)),
            ..Default::default()
        };
        assert_eq!(
            message(req.validate().unwrap_err()),
            "\"status\" is Expected integer, received float"
        );
    }

    #[test]
    fn test_batch_ids_accept_integral_floats() {
        let req = BatchUpdateRequest {
            cron_ids: Some(json!([1.0, 2])),
            ..Default::default()
        };
        assert_eq!(req.validate().unwrap().ids, vec![1, 2]);

        let req = BatchDeleteRequest {
            cron_ids: Some(json!([3.5])),
        };
        assert_eq!(
            message(req.validate().unwrap_err()),
            "\"cron_ids.0\" is Expected integer, received float"
        );

        let req = BatchDeleteRequest {
            cron_ids: Some(json!([1e300])),
        };
        assert_eq!(
            message(req.validate().unwrap_err()),
            "\"cron_ids.0\" is Expected integer, received float"
        );
    }

    #[test]
    fn test_update_rejects_out_of_range_flag() {
        let req = UpdateCronRequest {
            status: Some(json!(2)),
            ..Default::default()
        };
        assert_eq!(
            message(req.validate().unwrap_err()),
            "\"status\" is Number must be less than or equal to 1"
        );
    }

    #[test]
    fn test_update_rejects_non_numeric_deleted_at() {
        let req = UpdateCronRequest {
            deleted_at: Some(json!("yes")),
            ..Default::default()
        };
        assert_eq!(
            message(req.validate().unwrap_err()),
            "\"deleted_at\" is Expected number, received nan"
        );
    }

    #[test]
    fn test_batch_update_requires_ids() {
        let req = BatchUpdateRequest {
            status: Some(json!(1)),
            ..Default::default()
        };
        assert_eq!(message(req.validate().unwrap_err()), "\"cron_ids\" is Required");
    }

    #[test]
    fn test_batch_update_rejects_bad_element() {
        let req = BatchUpdateRequest {
            cron_ids: Some(json!([1, "2"])),
            ..Default::default()
        };
        assert_eq!(
            message(req.validate().unwrap_err()),
            "\"cron_ids.1\" is Expected number, received string"
        );
    }

    #[test]
    fn test_batch_update_valid() {
        let req = BatchUpdateRequest {
            cron_ids: Some(json!([3, 4])),
            status: None,
            deleted_at: Some(json!(0)),
        };

        let update = req.validate().unwrap();
        assert_eq!(update.ids, vec![3, 4]);
        assert_eq!(update.status, None);
        assert_eq!(update.deleted_at, Some(DeletedAtAction::Restore));
    }

    #[test]
    fn test_batch_delete_optional_ids() {
        assert_eq!(BatchDeleteRequest::default().validate().unwrap(), None);

        let req = BatchDeleteRequest {
            cron_ids: Some(json!([9])),
        };
        assert_eq!(req.validate().unwrap(), Some(vec![9]));

        let req = BatchDeleteRequest {
            cron_ids: Some(json!("9")),
        };
        assert_eq!(
            message(req.validate().unwrap_err()),
            "\"cron_ids\" is Expected array, received string"
        );
    }

    #[test]
    fn test_get_query_normalizes_value() {
        let query = GetCronQuery {
            cron: Some(" A.example ".to_string()),
        };
        assert_eq!(query.validate().unwrap(), Some("a.example".to_string()));
    }
}
