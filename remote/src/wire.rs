//! Mapping between the canister's JSON records and `whispr-types`.
//!
//! Different canister endpoints describe the same report differently: ids
//! come back as text, hex text or integers, statuses as strings or tagged
//! variants, optionals as `[]`/`[x]` arrays, timestamps as nanosecond
//! integers or numeric strings. Everything is normalized here, once.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};
use whispr_types::{
    AuthorityStats, Coordinates, EvidenceFile, Location, Report, ReportDraft, ReportId,
    ReportOrigin, ReportStatus, StatusFilter, Timestamp, Tokens,
};

use crate::RemoteError;

/// Unwrap a Candid optional: `[]` and `null` are absent, `[x]` is `x`.
pub fn optional(value: Option<&Value>) -> Option<&Value> {
    match value? {
        Value::Null => None,
        Value::Array(items) if items.len() <= 1 => items.first().and_then(|v| optional(Some(v))),
        other => Some(other),
    }
}

/// First present alias of a field, with optionals unwrapped.
fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| optional(obj.get(*name)))
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text that is neither empty nor a placeholder.
fn meaningful_text(value: Option<&Value>) -> Option<String> {
    text(value).filter(|s| !s.is_empty() && s != "N/A")
}

fn nat(value: Option<&Value>, what: &str) -> Result<Option<u64>, RemoteError> {
    match value {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| RemoteError::Decode(format!("{what}: {n} is not a natural number"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RemoteError::Decode(format!("{what}: {s:?} is not a natural number"))),
        Some(other) => Err(RemoteError::Decode(format!("{what}: unexpected {other}"))),
    }
}

pub fn decode_id(value: &Value) -> Result<ReportId, RemoteError> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_u64() => n.to_string(),
        other => return Err(RemoteError::Decode(format!("report id: unexpected {other}"))),
    };
    ReportId::parse(&raw).map_err(|e| RemoteError::Decode(e.to_string()))
}

pub fn decode_tokens(value: &Value) -> Result<Tokens, RemoteError> {
    nat(Some(value), "tokens")?
        .map(Tokens::new)
        .ok_or_else(|| RemoteError::Decode("tokens: missing".into()))
}

/// Map a status, degrading unknown or missing values to `Pending`.
pub fn decode_status(value: Option<&Value>) -> ReportStatus {
    let Some(value) = value else {
        return ReportStatus::Pending;
    };
    ReportStatus::from_wire(value).unwrap_or_else(|e| {
        tracing::warn!("{e}, treating as pending");
        ReportStatus::Pending
    })
}

/// Principals arrive as text or as `{"__principal__": text}`.
fn decode_principal(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Object(map) => ["__principal__", "text"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string),
        other => meaningful_text(Some(other)),
    }
}

pub fn decode_location(value: Option<&Value>) -> Location {
    let Some(Value::Object(map)) = value else {
        return Location::default();
    };
    let address = text(field(map, &["address"])).unwrap_or_default();
    let coordinates = match field(map, &["coordinates"]) {
        Some(Value::Object(c)) => {
            let lat = c.get("lat").and_then(Value::as_f64);
            let lng = c.get("lng").and_then(Value::as_f64);
            lat.zip(lng).map(|(lat, lng)| Coordinates { lat, lng })
        }
        _ => {
            let lat = map.get("latitude").and_then(Value::as_f64);
            let lng = map.get("longitude").and_then(Value::as_f64);
            lat.zip(lng).map(|(lat, lng)| Coordinates { lat, lng })
        }
    };
    Location {
        address,
        coordinates,
    }
}

fn decode_evidence_file(value: &Value) -> Option<EvidenceFile> {
    let map = value.as_object()?;
    let name = text(field(map, &["name"]))?;
    let media_type = text(field(map, &["file_type", "type", "media_type"]))
        .unwrap_or_else(|| "application/octet-stream".into());

    if let Some(Value::Array(bytes)) = map.get("content").or_else(|| map.get("data")) {
        let bytes: Vec<u8> = bytes
            .iter()
            .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect::<Option<_>>()?;
        return Some(EvidenceFile::from_bytes(name, media_type, &bytes));
    }

    let data = text(field(map, &["base64Data", "data"]))?;
    let data = if data.starts_with("data:") {
        data
    } else {
        format!("data:{media_type};base64,{data}")
    };
    let size = nat(field(map, &["size"]), "evidence size").ok().flatten();
    let size = size.unwrap_or_else(|| {
        data.split_once(";base64,")
            .and_then(|(_, payload)| STANDARD.decode(payload).ok())
            .map(|b| b.len() as u64)
            .unwrap_or_default()
    });
    Some(EvidenceFile {
        name,
        media_type,
        size,
        data: Some(data),
        url: None,
        recovery_needed: false,
    })
}

/// Evidence lists may be wrapped in a Candid optional (`[[...]]`).
pub fn decode_evidence(value: Option<&Value>) -> Vec<EvidenceFile> {
    match value {
        Some(Value::Array(items)) if items.len() == 1 && items[0].is_array() => {
            decode_evidence(items.first())
        }
        Some(Value::Array(items)) => items.iter().filter_map(decode_evidence_file).collect(),
        _ => Vec::new(),
    }
}

/// Decode one report record from any canister endpoint.
pub fn decode_report(value: &Value) -> Result<Report, RemoteError> {
    let map = value
        .as_object()
        .ok_or_else(|| RemoteError::Decode(format!("report: expected object, got {value}")))?;

    let id = decode_id(
        map.get("id")
            .ok_or_else(|| RemoteError::Decode("report: missing id".into()))?,
    )?;

    let status = decode_status(field(map, &["status"]));
    let stake = nat(field(map, &["stake_amount", "stake"]), "stake")?
        .map(Tokens::new)
        .unwrap_or_default();
    let mut reward = nat(field(map, &["reward_amount", "reward"]), "reward")?
        .map(Tokens::new)
        .unwrap_or_default();
    if status != ReportStatus::Verified && !reward.is_zero() {
        tracing::warn!(%id, %status, %reward, "remote reward on unverified report, clearing");
        reward = Tokens::ZERO;
    }

    let evidence = decode_evidence(map.get("evidence_files"));
    let evidence_count = nat(field(map, &["evidence_count"]), "evidence_count")?
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or_default()
        .max(evidence.len() as u32);

    Ok(Report {
        id,
        title: text(field(map, &["title"])).unwrap_or_default(),
        description: text(field(map, &["description"])).unwrap_or_default(),
        category: text(field(map, &["category"])).unwrap_or_else(|| "other".into()),
        location: decode_location(field(map, &["location"])),
        incident_date: meaningful_text(field(map, &["incident_date", "date"])),
        incident_time: meaningful_text(field(map, &["incident_time", "time"])),
        submitted_at: nat(field(map, &["date_submitted", "created_at"]), "date_submitted")?
            .map(Timestamp::from_nanos),
        submitter: decode_principal(field(map, &["submitter_id", "reporter"])),
        stake,
        reward,
        status,
        evidence,
        evidence_count,
        review_notes: meaningful_text(field(map, &["review_notes"])),
        reviewed_at: nat(field(map, &["review_date"]), "review_date")?.map(Timestamp::from_nanos),
        reviewer: decode_principal(field(map, &["reviewer"])),
        has_messages: field(map, &["has_messages"])
            .and_then(Value::as_bool)
            .unwrap_or_default(),
        origin: ReportOrigin::Remote,
    })
}

/// Decode a list of reports. Records that cannot be decoded are skipped.
pub fn decode_reports(value: &Value) -> Result<Vec<Report>, RemoteError> {
    let items = value
        .as_array()
        .ok_or_else(|| RemoteError::Decode(format!("report list: expected array, got {value}")))?;
    Ok(items
        .iter()
        .filter_map(|item| match decode_report(item) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("skipping remote report: {e}");
                None
            }
        })
        .collect())
}

pub fn decode_stats(value: &Value) -> Result<AuthorityStats, RemoteError> {
    let map = value
        .as_object()
        .ok_or_else(|| RemoteError::Decode(format!("statistics: expected object, got {value}")))?;
    let count = |name: &str| nat(map.get(name), name).map(Option::unwrap_or_default);
    Ok(AuthorityStats {
        reports_pending: count("reports_pending")?,
        reports_verified: count("reports_verified")?,
        reports_rejected: count("reports_rejected")?,
        total_rewards_distributed: Tokens::new(count("total_rewards_distributed")?),
    })
}

/// Unwrap a Candid `Result`: `{"Ok": x}` is `x`, `{"Err": e}` an application error.
///
/// Values that are not a `Result` variant pass through unchanged.
pub fn unwrap_result(value: Value) -> Result<Value, RemoteError> {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("Ok") => {
            Ok(map.remove("Ok").unwrap_or(Value::Null))
        }
        Value::Object(map) if map.len() == 1 && map.contains_key("Err") => {
            let message = map
                .get("Err")
                .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                .unwrap_or_default();
            Err(RemoteError::Application(message))
        }
        other => Ok(other),
    }
}

/// Canister-side verdict of a mutation: `Ok`, `true`, or `null` succeed.
pub fn expect_success(value: Value, what: &str) -> Result<(), RemoteError> {
    match unwrap_result(value)? {
        Value::Bool(false) => Err(RemoteError::Application(format!("{what} was refused"))),
        _ => Ok(()),
    }
}

fn candid_opt<T: Into<Value>>(value: Option<T>) -> Value {
    match value {
        Some(v) => json!([v.into()]),
        None => json!([]),
    }
}

pub fn encode_id(id: &ReportId) -> Value {
    Value::String(id.to_string())
}

pub fn encode_notes(notes: Option<&str>) -> Value {
    candid_opt(notes)
}

pub fn encode_status(status: ReportStatus) -> Value {
    let tag = match status {
        ReportStatus::Pending => "Pending",
        ReportStatus::UnderReview => "UnderReview",
        ReportStatus::Verified => "Approved",
        ReportStatus::Rejected => "Rejected",
    };
    let mut variant = Map::new();
    variant.insert(tag.to_string(), Value::Null);
    Value::Object(variant)
}

/// Encode a status filter; `All` has no canister variant and is `None`.
pub fn encode_status_filter(filter: StatusFilter) -> Option<Value> {
    match filter {
        StatusFilter::All => None,
        StatusFilter::Only(status) => Some(encode_status(status)),
    }
}

pub fn encode_draft(draft: &ReportDraft) -> Value {
    let coordinates = candid_opt(
        draft
            .location
            .coordinates
            .map(|c| json!({ "lat": c.lat, "lng": c.lng })),
    );
    let evidence: Vec<Value> = draft
        .evidence
        .iter()
        .map(|file| {
            let content = file.decode_bytes().unwrap_or_else(|e| {
                tracing::warn!("sending empty evidence payload: {e}");
                Vec::new()
            });
            json!({
                "name": file.name,
                "file_type": file.media_type,
                "size": file.size,
                "content": content,
            })
        })
        .collect();
    json!({
        "title": draft.title,
        "description": draft.description,
        "category": draft.category,
        "location": {
            "address": draft.location.address,
            "coordinates": coordinates,
        },
        "date": candid_opt(draft.incident_date.clone()),
        "time": candid_opt(draft.incident_time.clone()),
        "stake_amount": draft.stake.raw(),
        "evidence_files": evidence,
    })
}
