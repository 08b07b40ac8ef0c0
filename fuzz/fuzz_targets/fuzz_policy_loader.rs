#![no_main]

use libfuzzer_sys::fuzz_target;
use palisade_policy::{Effect, LoadError, load_policy_from_slice};

// Arbitrary bytes must either decode into a well-formed policy or fail with
// one of the two document error kinds. The loader never panics and never
// reports an I/O error for in-memory input.
fuzz_target!(|data: &[u8]| {
    match load_policy_from_slice(data) {
        Ok(policy) => {
            for rule in policy.rules() {
                assert!(
                    !rule.actions().is_empty(),
                    "accepted rule `{}` has no actions",
                    rule.id()
                );
                assert!(matches!(rule.effect(), Effect::Allow | Effect::Deny));
            }
        }
        Err(err) => {
            assert!(
                matches!(
                    err,
                    LoadError::MalformedSyntax { .. } | LoadError::SchemaViolation { .. }
                ),
                "unexpected error kind for in-memory input: {}",
                err.kind()
            );
        }
    }
});
