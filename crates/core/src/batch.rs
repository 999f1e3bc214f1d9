//! Per-item isolated batch execution

use crate::error::{ErrorKind, FloodRiskError, Result};
use rayon::prelude::*;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::warn;

/// Outcome of one batch input, tagged with its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem<T> {
    pub index: usize,
    pub outcome: Result<T>,
}

impl<T> BatchItem<T> {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&FloodRiskError> {
        self.outcome.as_ref().err()
    }
}

/// Serialized as `{"index", "status": "ok", "result"}` or
/// `{"index", "status": "error", "error": {"kind", "message"}}`.
impl<T: Serialize> Serialize for BatchItem<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct ErrorBody {
            kind: ErrorKind,
            message: String,
        }

        let mut state = serializer.serialize_struct("BatchItem", 3)?;
        state.serialize_field("index", &self.index)?;
        match &self.outcome {
            Ok(value) => {
                state.serialize_field("status", "ok")?;
                state.serialize_field("result", value)?;
            }
            Err(e) => {
                state.serialize_field("status", "error")?;
                state.serialize_field(
                    "error",
                    &ErrorBody {
                        kind: e.kind(),
                        message: e.to_string(),
                    },
                )?;
            }
        }
        state.end()
    }
}

/// Apply `op` to every input in parallel, collecting one [`BatchItem`] per input in
/// input order. A failing item never aborts the others.
pub fn run_batch<I, T, F>(what: &'static str, inputs: &[I], op: F) -> Vec<BatchItem<T>>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> Result<T> + Sync + Send,
{
    let items: Vec<BatchItem<T>> = inputs
        .par_iter()
        .enumerate()
        .map(|(index, input)| BatchItem {
            index,
            outcome: op(input),
        })
        .collect();

    for item in &items {
        if let Err(e) = &item.outcome {
            warn!(index = item.index, error = %e, "{} batch item failed", what);
        }
    }
    items
}
