//! Shared domain enumerations aligned with persisted database enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Publication status given to imported records (mirrors Postgres enum `record_status`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "record_status", rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Publish,
    Draft,
    Private,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Publish => "publish",
            PostStatus::Draft => "draft",
            PostStatus::Private => "private",
        }
    }
}

impl FromStr for PostStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "publish" => Ok(PostStatus::Publish),
            "draft" => Ok(PostStatus::Draft),
            "private" => Ok(PostStatus::Private),
            other => Err(DomainError::unsupported("post_status", other)),
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of record created by an import (mirrors Postgres enum `record_type`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "record_type", rename_all = "snake_case")]
pub enum PostType {
    #[default]
    Post,
    Page,
}

impl PostType {
    pub fn as_str(self) -> &'static str {
        match self {
            PostType::Post => "post",
            PostType::Page => "page",
        }
    }
}

impl FromStr for PostType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "post" => Ok(PostType::Post),
            "page" => Ok(PostType::Page),
            other => Err(DomainError::unsupported("post_type", other)),
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_import_defaults() {
        assert_eq!(PostStatus::default(), PostStatus::Publish);
        assert_eq!(PostType::default(), PostType::Post);
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert_eq!("draft".parse::<PostStatus>(), Ok(PostStatus::Draft));
        assert_eq!("page".parse::<PostType>(), Ok(PostType::Page));
        assert_eq!(
            "trash".parse::<PostStatus>(),
            Err(DomainError::unsupported("post_status", "trash"))
        );
        assert!("attachment".parse::<PostType>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&PostStatus::Private).expect("serialize");
        assert_eq!(json, "\"private\"");
        let parsed: PostType = serde_json::from_str("\"page\"").expect("deserialize");
        assert_eq!(parsed, PostType::Page);
    }
}
