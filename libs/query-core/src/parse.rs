//! `filter` / `sort` token parsing.
//!
//! A batch either parses completely or fails on the first bad token;
//! partial results are never returned.

use crate::ast::{FilterClause, FilterOp, SortClause, SortDir};
use crate::error::{Error, Rejection};

pub const MIN_FILTER_VALUE_LEN: usize = 1;
pub const MAX_FILTER_VALUE_LEN: usize = 200;

/// Parse `field:operation:value` tokens.
///
/// `None` (parameter absent) stays `None`. A present but empty list is rejected.
pub fn parse_filters<S: AsRef<str>>(
    tokens: Option<&[S]>,
) -> Result<Option<Vec<FilterClause>>, Error> {
    let Some(tokens) = tokens else {
        return Ok(None);
    };
    if tokens.is_empty() {
        return Err(Error::InvalidFilter {
            token: String::new(),
            reason: Rejection::EmptyList,
        });
    }

    tokens
        .iter()
        .map(|t| parse_filter(t.as_ref()))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

pub fn parse_filter(token: &str) -> Result<FilterClause, Error> {
    let reject = |reason| Error::InvalidFilter {
        token: token.to_string(),
        reason,
    };

    let parts: Vec<&str> = token.split(':').collect();
    let [field, op, value] = parts.as_slice() else {
        return Err(reject(Rejection::WrongPartCount));
    };

    if field.is_empty() {
        return Err(reject(Rejection::EmptyField));
    }
    let op = FilterOp::from_token(op).ok_or_else(|| reject(Rejection::UnknownOperation))?;

    let len = value.chars().count();
    if !(MIN_FILTER_VALUE_LEN..=MAX_FILTER_VALUE_LEN).contains(&len) {
        return Err(reject(Rejection::ValueLength));
    }

    Ok(FilterClause {
        field: field.to_lowercase(),
        op,
        value: (*value).to_string(),
    })
}

/// Parse `field` / `-field` tokens. Same absence rules as [`parse_filters`].
pub fn parse_sorts<S: AsRef<str>>(tokens: Option<&[S]>) -> Result<Option<Vec<SortClause>>, Error> {
    let Some(tokens) = tokens else {
        return Ok(None);
    };
    if tokens.is_empty() {
        return Err(Error::InvalidSort {
            token: String::new(),
            reason: Rejection::EmptyList,
        });
    }

    tokens
        .iter()
        .map(|t| parse_sort(t.as_ref()))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

pub fn parse_sort(token: &str) -> Result<SortClause, Error> {
    let reject = |reason| Error::InvalidSort {
        token: token.to_string(),
        reason,
    };

    let (field, dir) = match token.chars().next() {
        Some('-') => (&token[1..], SortDir::Desc),
        Some(c) if c.is_alphabetic() => (token, SortDir::Asc),
        Some(_) => return Err(reject(Rejection::BadSortPrefix)),
        None => return Err(reject(Rejection::EmptyField)),
    };

    if field.is_empty() {
        return Err(reject(Rejection::EmptyField));
    }

    Ok(SortClause {
        field: field.to_lowercase(),
        dir,
    })
}
