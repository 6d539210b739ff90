// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity exactly as upstream returned it. No field is guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct User(Map<String, Value>);

impl User {
    /// Any JSON object is a user; anything else is not.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn id(&self) -> Option<&Value> {
        self.0.get("id").or_else(|| self.0.get("_id"))
    }

    pub fn email(&self) -> Option<&str> {
        self.str_field("email")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn role(&self) -> Option<&str> {
        self.str_field("role")
    }

    pub fn display_name(&self) -> String {
        if let Some(label) = self
            .name()
            .or_else(|| self.str_field("username"))
            .or_else(|| self.email())
        {
            return label.to_string();
        }
        match self.id() {
            Some(Value::String(id)) => id.clone(),
            Some(id) => id.to_string(),
            None => "unknown user".to_string(),
        }
    }
}

fn user_field(body: &Value) -> Option<User> {
    body.get("user").cloned().and_then(User::from_value)
}

#[derive(Debug, Clone, Default)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl LoginResponse {
    /// Lenient: a reply without a usable token or user still counts as a login.
    pub fn from_body(body: &Value) -> Self {
        Self {
            token: body
                .get("token")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            user: user_field(body),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeResponse {
    pub user: Option<User>,
}

impl MeResponse {
    pub fn from_body(body: &Value) -> Self {
        Self { user: user_field(body) }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct NewFrase<'a> {
    pub frase: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NewEvent<'a> {
    pub name: &'a str,
    pub date: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Confession<'a> {
    pub message: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Entry shipped to `/api/logs/ingest`.
#[derive(Debug, Serialize)]
pub struct LogEntry<'a> {
    pub source: &'a str,
    pub level: LogLevel,
    pub message: &'a str,
    pub meta: Option<&'a Value>,
}
