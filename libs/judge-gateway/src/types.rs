use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One execution to run on the judge.
///
/// Fields are plain text. The gateway encodes them for the wire and never
/// inspects their contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub source_code: String,
    pub language_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    /// Seconds of CPU time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_time_limit: Option<f64>,
    /// Seconds of wall clock time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_time_limit: Option<f64>,
    /// Kilobytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u64>,
}

impl SubmissionRequest {
    pub fn new(source_code: impl Into<String>, language_id: u32) -> Self {
        Self {
            source_code: source_code.into(),
            language_id,
            stdin: None,
            expected_output: None,
            cpu_time_limit: None,
            wall_time_limit: None,
            memory_limit: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }
}

/// Judge execution state.
///
/// Only `InQueue` and `Processing` are unfinished. Everything else is terminal,
/// including ids this crate does not know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusId {
    InQueue,
    Processing,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeErrorSigsegv,
    RuntimeErrorSigxfsz,
    RuntimeErrorSigfpe,
    RuntimeErrorSigabrt,
    RuntimeErrorNzec,
    RuntimeErrorOther,
    InternalError,
    ExecFormatError,
    Unknown(u32),
}

impl StatusId {
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => StatusId::InQueue,
            2 => StatusId::Processing,
            3 => StatusId::Accepted,
            4 => StatusId::WrongAnswer,
            5 => StatusId::TimeLimitExceeded,
            6 => StatusId::CompilationError,
            7 => StatusId::RuntimeErrorSigsegv,
            8 => StatusId::RuntimeErrorSigxfsz,
            9 => StatusId::RuntimeErrorSigfpe,
            10 => StatusId::RuntimeErrorSigabrt,
            11 => StatusId::RuntimeErrorNzec,
            12 => StatusId::RuntimeErrorOther,
            13 => StatusId::InternalError,
            14 => StatusId::ExecFormatError,
            other => StatusId::Unknown(other),
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            StatusId::InQueue => 1,
            StatusId::Processing => 2,
            StatusId::Accepted => 3,
            StatusId::WrongAnswer => 4,
            StatusId::TimeLimitExceeded => 5,
            StatusId::CompilationError => 6,
            StatusId::RuntimeErrorSigsegv => 7,
            StatusId::RuntimeErrorSigxfsz => 8,
            StatusId::RuntimeErrorSigfpe => 9,
            StatusId::RuntimeErrorSigabrt => 10,
            StatusId::RuntimeErrorNzec => 11,
            StatusId::RuntimeErrorOther => 12,
            StatusId::InternalError => 13,
            StatusId::ExecFormatError => 14,
            StatusId::Unknown(id) => *id,
        }
    }

    /// True for every state except `InQueue` and `Processing`
    pub fn is_finished(&self) -> bool {
        !matches!(self, StatusId::InQueue | StatusId::Processing)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, StatusId::Accepted)
    }

    pub fn description(&self) -> &'static str {
        match self {
            StatusId::InQueue => "In Queue",
            StatusId::Processing => "Processing",
            StatusId::Accepted => "Accepted",
            StatusId::WrongAnswer => "Wrong Answer",
            StatusId::TimeLimitExceeded => "Time Limit Exceeded",
            StatusId::CompilationError => "Compilation Error",
            StatusId::RuntimeErrorSigsegv => "Runtime Error (SIGSEGV)",
            StatusId::RuntimeErrorSigxfsz => "Runtime Error (SIGXFSZ)",
            StatusId::RuntimeErrorSigfpe => "Runtime Error (SIGFPE)",
            StatusId::RuntimeErrorSigabrt => "Runtime Error (SIGABRT)",
            StatusId::RuntimeErrorNzec => "Runtime Error (NZEC)",
            StatusId::RuntimeErrorOther => "Runtime Error (Other)",
            StatusId::InternalError => "Internal Error",
            StatusId::ExecFormatError => "Exec Format Error",
            StatusId::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl Serialize for StatusId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.id())
    }
}

impl<'de> Deserialize<'de> for StatusId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = u32::deserialize(deserializer)?;
        Ok(StatusId::from_id(id))
    }
}

/// `{ "id": 3, "description": "Accepted" }` as the judge reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    #[serde(default)]
    pub description: String,
}

impl Status {
    pub fn new(id: StatusId) -> Self {
        Self {
            id,
            description: id.description().to_string(),
        }
    }
}

/// Result of one execution.
///
/// Output fields are `None` when the judge sent nothing, which is distinct
/// from `Some("")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    #[serde(default)]
    pub token: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub exit_signal: Option<i32>,
    /// Seconds, as the judge formats it ("0.012")
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub wall_time: Option<String>,
    /// Kilobytes
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl SubmissionResponse {
    /// Response carrying only a token and status, for tests and placeholders
    pub fn pending(token: impl Into<String>, status: StatusId) -> Self {
        Self {
            token: Some(token.into()),
            status: Status::new(status),
            stdout: None,
            stderr: None,
            compile_output: None,
            message: None,
            exit_code: None,
            exit_signal: None,
            time: None,
            wall_time: None,
            memory: None,
            created_at: None,
            finished_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.id.is_finished()
    }
}

/// Body of `POST /submissions/batch`
#[derive(Debug, Clone, Serialize)]
pub struct BatchSubmitBody<'a> {
    pub submissions: &'a [WireSubmission],
}

/// One entry of the batch submit response; rejected items carry no token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    #[serde(default)]
    pub token: Option<String>,
}

/// Body of `GET /submissions/batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusBody {
    pub submissions: Vec<SubmissionResponse>,
}

/// Base64-encoded form of a [`SubmissionRequest`], as sent to the judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSubmission {
    pub source_code: String,
    pub language_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_time_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_time_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u64>,
}
