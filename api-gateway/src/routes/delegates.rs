use std::cmp::Ordering;

use axum::{Json, extract::{Query, State}, http::StatusCode};
use serde::{Deserialize, Serialize};

use chain::Delegate;

use crate::state::SharedState;

/// Query parameters for `GET /delegates` (`GET_DELEGATES`).
///
/// `sort` is a comma-separated list of `field:direction` pairs, e.g.
/// `sort=votes:desc,username:asc`, standing in for the RPC's
/// `[[field, 'ASC'|'DESC'], ...]` array over a query string.
#[derive(Debug, Deserialize)]
pub struct GetDelegatesQuery {
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
    pub username: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DelegateDto {
    pub username: String,
    pub public_key: String,
    pub votes: u64,
    pub missed_blocks: u64,
    pub forged_blocks: u64,
    pub confirmed_vote_count: u64,
    pub approval: f64,
}

impl From<&Delegate> for DelegateDto {
    fn from(d: &Delegate) -> Self {
        DelegateDto {
            username: d.username.clone(),
            public_key: d.public_key.to_hex(),
            votes: d.votes,
            missed_blocks: d.missed_blocks,
            forged_blocks: d.forged_blocks,
            confirmed_vote_count: d.confirmed_vote_count,
            approval: d.approval,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetDelegatesResponse {
    pub delegates: Vec<DelegateDto>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub errors: Vec<String>,
}

fn invalid_request(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            success: false,
            errors: vec![message.into()],
        }),
    )
}

enum SortDirection {
    Asc,
    Desc,
}

fn parse_sort(spec: &str) -> Result<Vec<(String, SortDirection)>, (StatusCode, Json<ErrorResponse>)> {
    spec.split(',')
        .map(|pair| {
            let mut parts = pair.splitn(2, ':');
            let field = parts.next().unwrap_or("").trim().to_string();
            let direction = match parts.next().unwrap_or("asc").trim().to_ascii_lowercase().as_str() {
                "asc" => SortDirection::Asc,
                "desc" => SortDirection::Desc,
                other => {
                    return Err(invalid_request(format!(
                        "IS NOT VALID REQUEST:'GET_DELEGATES'... unknown sort direction '{other}'"
                    )));
                }
            };
            Ok((field, direction))
        })
        .collect()
}

const SORTABLE_FIELDS: &[&str] = &[
    "votes",
    "missedBlocks",
    "forgedBlocks",
    "confirmedVoteCount",
    "approval",
    "username",
    "publicKey",
];

fn validate_sort_field(field: &str) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if SORTABLE_FIELDS.contains(&field) {
        Ok(())
    } else {
        Err(invalid_request(format!(
            "IS NOT VALID REQUEST:'GET_DELEGATES'... unknown sort field '{field}'"
        )))
    }
}

fn sort_key<'a>(d: &'a Delegate, field: &str) -> SortValue<'a> {
    match field {
        "votes" => SortValue::U64(d.votes),
        "missedBlocks" => SortValue::U64(d.missed_blocks),
        "forgedBlocks" => SortValue::U64(d.forged_blocks),
        "confirmedVoteCount" => SortValue::U64(d.confirmed_vote_count),
        "approval" => SortValue::F64(d.approval),
        "username" => SortValue::Str(&d.username),
        _ => SortValue::PublicKeyHex(d.public_key.to_hex()),
    }
}

enum SortValue<'a> {
    U64(u64),
    F64(f64),
    Str(&'a str),
    PublicKeyHex(String),
}

fn compare_values(a: &SortValue<'_>, b: &SortValue<'_>) -> Ordering {
    match (a, b) {
        (SortValue::U64(x), SortValue::U64(y)) => x.cmp(y),
        (SortValue::F64(x), SortValue::F64(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (SortValue::Str(x), SortValue::Str(y)) => x.cmp(y),
        (SortValue::PublicKeyHex(x), SortValue::PublicKeyHex(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// `GET /delegates` (`GET_DELEGATES`)
///
/// `limit` is required and must fall in `1..=100`; `offset` defaults to
/// zero; `username`, if present, must be at least 3 characters and is
/// applied as a prefix filter; `sort` defaults to ascending public key
/// once the username filter (if any) has been applied, matching the
/// deterministic order fixtures imply for the RPC when `sort` is
/// omitted.
pub async fn get_delegates(
    State(state): State<SharedState>,
    Query(query): Query<GetDelegatesQuery>,
) -> Result<Json<GetDelegatesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let limit = query.limit.ok_or_else(|| {
        invalid_request("IS NOT VALID REQUEST:'GET_DELEGATES'... Missing required property: limit")
    })?;
    if !(1..=100).contains(&limit) {
        return Err(invalid_request(format!(
            "IS NOT VALID REQUEST:'GET_DELEGATES'... limit must be between 1 and 100, got {limit}"
        )));
    }

    if let Some(username) = &query.username {
        if username.chars().count() < 3 {
            return Err(invalid_request(
                "IS NOT VALID REQUEST:'GET_DELEGATES'... username must be at least 3 characters",
            ));
        }
    }

    let sort_fields = match &query.sort {
        Some(spec) => parse_sort(spec)?,
        None => Vec::new(),
    };
    for (field, _) in &sort_fields {
        validate_sort_field(field)?;
    }

    let engine = state.engine.lock().await;

    let mut matched: Vec<&Delegate> = engine
        .accounts()
        .delegates()
        .filter(|d| match &query.username {
            Some(prefix) => d.username.starts_with(prefix.as_str()),
            None => true,
        })
        .collect();

    let count = matched.len();

    if sort_fields.is_empty() {
        matched.sort_by(|a, b| a.public_key.to_hex().cmp(&b.public_key.to_hex()));
    } else {
        matched.sort_by(|a, b| {
            for (field, direction) in &sort_fields {
                let ordering = compare_values(&sort_key(a, field), &sort_key(b, field));
                let ordering = match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            // Deterministic tiebreak once every requested field compares equal.
            a.public_key.to_hex().cmp(&b.public_key.to_hex())
        });
    }

    let page: Vec<DelegateDto> = matched
        .into_iter()
        .skip(query.offset as usize)
        .take(limit as usize)
        .map(DelegateDto::from)
        .collect();

    Ok(Json(GetDelegatesResponse {
        delegates: page,
        count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain::PublicKey;

    fn delegate(username: &str, byte: u8, votes: u64) -> Delegate {
        let mut d = Delegate::new(username.to_string(), PublicKey([byte; 32])).unwrap();
        d.votes = votes;
        d
    }

    #[test]
    fn sort_by_votes_desc_ties_break_on_public_key() {
        let delegates = vec![
            delegate("delegate1", 1, 2),
            delegate("delegate2", 2, 0),
            delegate("delegate3", 3, 0),
            delegate("delegate4", 4, 0),
        ];
        let mut refs: Vec<&Delegate> = delegates.iter().collect();
        let fields = vec![("votes".to_string(), SortDirection::Desc)];
        refs.sort_by(|a, b| {
            let ordering = compare_values(&sort_key(a, &fields[0].0), &sort_key(b, &fields[0].0)).reverse();
            if ordering != Ordering::Equal {
                ordering
            } else {
                a.public_key.to_hex().cmp(&b.public_key.to_hex())
            }
        });
        assert_eq!(refs[0].username, "delegate1");
        assert_eq!(refs[1].username, "delegate2");
        assert_eq!(refs[2].username, "delegate3");
    }

    #[test]
    fn validate_sort_field_rejects_unknown_names() {
        assert!(validate_sort_field("votes").is_ok());
        assert!(validate_sort_field("bogus").is_err());
    }

    #[test]
    fn parse_sort_accepts_field_and_direction() {
        let parsed = parse_sort("votes:desc,username:asc").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].0, "votes");
        assert_eq!(parsed[1].0, "username");
    }

    #[test]
    fn parse_sort_rejects_unknown_direction() {
        assert!(parse_sort("votes:sideways").is_err());
    }
}
