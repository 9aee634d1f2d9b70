use aws_lambda_events::event::sqs::SqsEvent;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Invalid invocation payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Queue message {message_id} has no body")]
    EmptyMessage { message_id: String },
    #[error("Invocation names no user and no default_user is configured")]
    NoUser,
}

#[derive(Debug, Deserialize)]
struct UserMessage {
    user_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct DirectPayload {
    #[serde(default)]
    user_name: Option<String>,
}

/// What triggered the job: a direct call (console, schedule, local run)
/// or a batch of queue messages each naming one user
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Direct { user_name: Option<String> },
    Queue { user_names: Vec<String> },
}

impl Invocation {
    pub fn from_payload(payload: Value) -> Result<Self, EventError> {
        if payload.get("Records").is_some() {
            let event: SqsEvent = serde_json::from_value(payload)?;
            let user_names = event
                .records
                .into_iter()
                .map(|record| {
                    let body = record.body.ok_or_else(|| EventError::EmptyMessage {
                        message_id: record.message_id.unwrap_or_default(),
                    })?;
                    let message: UserMessage = serde_json::from_str(&body)?;
                    Ok(message.user_name)
                })
                .collect::<Result<Vec<_>, EventError>>()?;
            return Ok(Invocation::Queue { user_names });
        }

        let direct = match payload {
            Value::Null => DirectPayload::default(),
            payload => serde_json::from_value(payload)?,
        };
        Ok(Invocation::Direct {
            user_name: direct.user_name,
        })
    }

    /// Users to process, in delivery order
    pub fn users(&self, default_user: Option<&str>) -> Result<Vec<String>, EventError> {
        match self {
            Invocation::Queue { user_names } => Ok(user_names.clone()),
            Invocation::Direct { user_name } => user_name
                .as_deref()
                .or(default_user)
                .map(|user| vec![user.to_string()])
                .ok_or(EventError::NoUser),
        }
    }
}
