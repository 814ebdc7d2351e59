//! Translation of engine errors into client errors.

use crate::error::Failure;
use crate::error::RawError;
use crate::graphql;
use crate::graphql::ErrorClassification;

/// Translates every raw error, preserving their order.
pub fn translate(errors: &[RawError]) -> Vec<graphql::Error> {
    errors.iter().map(translate_error).collect()
}

/// Translates a single raw error.
///
/// When a field resolver failed, the message of what it raised is recovered
/// from under the invocation wrapper and reported without locations.
/// Anything else is forwarded unchanged.
pub fn translate_error(error: &RawError) -> graphql::Error {
    if let RawError::DataFetching { exception, .. } = error
        && let Some(Failure::Invocation {
            target: Some(target),
        }) = exception.cause()
    {
        return graphql::Error::builder()
            .message(target.message().unwrap_or_default())
            .classification(ErrorClassification::DataFetchingException)
            .build();
    }
    error.error().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::Location;
    use crate::graphql::PathSegment;

    fn engine_error(message: &str) -> graphql::Error {
        graphql::Error::builder()
            .message(message)
            .location(Location { line: 1, column: 3 })
            .path(vec![PathSegment::Field("hero".to_string())])
            .classification(ErrorClassification::DataFetchingException)
            .build()
    }

    #[test]
    fn unwraps_invocation_targets() {
        let raw = RawError::DataFetching {
            error: engine_error("Exception while fetching data (/hero) : boom"),
            exception: Failure::caused_by(
                "exception while fetching data",
                Failure::invocation(Failure::caused_by("boom", Failure::new("root cause"))),
            ),
        };
        let translated = translate(&[raw]);
        assert_eq!(translated.len(), 1);
        assert_eq!(translated[0].message, "boom");
        assert!(translated[0].locations.is_empty());
        assert!(translated[0].path.is_empty());
        assert_eq!(
            translated[0].classification(),
            ErrorClassification::DataFetchingException
        );
    }

    #[test]
    fn other_shapes_pass_through() {
        let without_cause = RawError::DataFetching {
            error: engine_error("Non-null field returned null"),
            exception: Failure::new("Non-null field returned null"),
        };
        let cause_not_invocation = RawError::DataFetching {
            error: engine_error("outer"),
            exception: Failure::caused_by("outer", Failure::new("inner")),
        };
        let empty_invocation = RawError::DataFetching {
            error: engine_error("wrapped"),
            exception: Failure::caused_by("wrapped", Failure::Invocation { target: None }),
        };
        let validation = RawError::Engine(
            graphql::Error::builder()
                .message("Cannot query field \"villain\" on type \"Query\".")
                .location(Location { line: 1, column: 3 })
                .classification(ErrorClassification::ValidationError)
                .build(),
        );
        let raw = vec![without_cause, cause_not_invocation, empty_invocation, validation];

        let translated = translate(&raw);
        let expected: Vec<_> = raw.iter().map(|error| error.error().clone()).collect();
        assert_eq!(translated, expected);
    }

    #[test]
    fn invocation_at_the_top_is_not_unwrapped() {
        // the wrapper has to be the cause of the data fetching exception
        let raw = RawError::DataFetching {
            error: engine_error("top"),
            exception: Failure::invocation(Failure::new("boom")),
        };
        assert_eq!(translate_error(&raw).message, "top");
    }

    #[test]
    fn order_is_preserved() {
        let raw: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|message| RawError::Engine(engine_error(message)))
            .collect();
        let messages: Vec<_> = translate(&raw)
            .into_iter()
            .map(|error| error.message)
            .collect();
        assert_eq!(messages, ["a", "b", "c"]);
    }
}
