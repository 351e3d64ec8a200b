//! Minimal CLI parsing for the admin commands.

use std::env;

use anyhow::{Context, Result, bail};
use serde_json::Value as JsonValue;

pub const USAGE: &str = "\
usage: crudkit <command> [flags]

commands:
  models                 list models exposed by the API
  find-many <Model>      list records
  find <Model> <id>      fetch one record
  page <Model>           fetch one page of records
  count <Model>          count records
  delete <Model> <id>    delete one record
  clear-cache            clear the server cache

flags:
  --where <json>         filter object
  --order-by <json>      ordering object
  --page <n>             page number (page)
  --limit <n>            page size (page, find-many)";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Models,
    FindMany { model: String },
    Find { model: String, id: String },
    Page { model: String },
    Count { model: String },
    Delete { model: String, id: String },
    ClearCache,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub command: Command,
    pub filter: Option<JsonValue>,
    pub order_by: Option<JsonValue>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl CliOptions {
    pub fn from_args() -> Result<Self> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut positional = Vec::new();
        let mut filter = None;
        let mut order_by = None;
        let mut page = None;
        let mut limit = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if arg.starts_with("--") => (flag.to_string(), Some(value.to_string())),
                _ => (arg.clone(), None),
            };
            let mut value = |name: &str| -> Result<String> {
                inline
                    .clone()
                    .or_else(|| args.next())
                    .with_context(|| format!("{} requires a value", name))
            };

            match flag.as_str() {
                "--where" => filter = Some(parse_json("--where", &value("--where")?)?),
                "--order-by" => order_by = Some(parse_json("--order-by", &value("--order-by")?)?),
                "--page" => page = Some(parse_number("--page", &value("--page")?)?),
                "--limit" => limit = Some(parse_number("--limit", &value("--limit")?)?),
                "-h" | "--help" => positional.insert(0, "help".to_string()),
                _ if flag.starts_with("--") => bail!("unknown flag {}", flag),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let name = positional.next().unwrap_or_else(|| "help".to_string());
        let mut next = |what: &str| {
            positional
                .next()
                .with_context(|| format!("{} requires <{}>", name, what))
        };

        let command = match name.as_str() {
            "models" => Command::Models,
            "find-many" => Command::FindMany { model: next("Model")? },
            "find" => Command::Find {
                model: next("Model")?,
                id: next("id")?,
            },
            "page" => Command::Page { model: next("Model")? },
            "count" => Command::Count { model: next("Model")? },
            "delete" => Command::Delete {
                model: next("Model")?,
                id: next("id")?,
            },
            "clear-cache" => Command::ClearCache,
            "help" => Command::Help,
            other => bail!("unknown command {}", other),
        };

        Ok(Self {
            command,
            filter,
            order_by,
            page,
            limit,
        })
    }
}

fn parse_json(flag: &str, raw: &str) -> Result<JsonValue> {
    serde_json::from_str(raw).with_context(|| format!("{} expects JSON, got {}", flag, raw))
}

fn parse_number(flag: &str, raw: &str) -> Result<u32> {
    raw.parse()
        .with_context(|| format!("{} expects a positive number, got {}", flag, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_page_with_flags() {
        let options = parse(&["page", "Product", "--page", "2", "--limit=50", "--where", r#"{"active":true}"#])
            .unwrap();
        assert_eq!(options.command, Command::Page { model: "Product".into() });
        assert_eq!(options.page, Some(2));
        assert_eq!(options.limit, Some(50));
        assert_eq!(options.filter, Some(json!({ "active": true })));
    }

    #[test]
    fn test_parse_find_requires_id() {
        assert!(parse(&["find", "User"]).is_err());
        assert_matches!(
            parse(&["delete", "User", "u1"]).unwrap().command,
            Command::Delete { ref model, ref id } if model == "User" && id == "u1"
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse(&["count", "User", "--where", "{not json"]).is_err());
        assert!(parse(&["count", "User", "--verbose"]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
        assert_eq!(parse(&[]).unwrap().command, Command::Help);
    }
}
