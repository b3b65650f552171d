//! Reference normalization: the single boundary where stored dependency
//! encodings become typed [`Reference`]s, and where typed references are
//! written back.

use crate::entities::{BareSubtaskReferences, RawReference, Reference};
use crate::errors::{IntegrityError, IntegrityResult};

/// Owner information needed to read a bare integer.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceContext<'a> {
    /// Tag the owning entity lives in
    pub tag: &'a str,

    /// Identity of the entity whose dependency list is being read
    pub owner: Reference,

    /// How bare integers are read when the owner is a subtask
    pub bare_subtask_references: BareSubtaskReferences,
}

impl<'a> ReferenceContext<'a> {
    pub fn new(tag: &'a str, owner: Reference, policy: BareSubtaskReferences) -> Self {
        Self {
            tag,
            owner,
            bare_subtask_references: policy,
        }
    }

    /// Same tag and policy, different owner.
    pub fn for_owner(&self, owner: Reference) -> Self {
        Self { owner, ..*self }
    }
}

/// Resolve a stored dependency entry into a typed reference.
///
/// - `"p.s"` is always `Subtask(p, s)`.
/// - `"n"` is always `Task(n)`.
/// - integer `n` is `Task(n)` for a task owner; for a subtask owner it follows
///   the configured [`BareSubtaskReferences`] policy.
pub fn normalize(raw: &RawReference, ctx: &ReferenceContext<'_>) -> IntegrityResult<Reference> {
    match raw {
        RawReference::Text(text) => text.parse::<Reference>().map_err(|err| match err {
            IntegrityError::MalformedReference { raw, reason } => {
                IntegrityError::MalformedReference {
                    raw,
                    reason: format!("{reason} (dependency of {} in tag '{}')", ctx.owner, ctx.tag),
                }
            }
            other => other,
        }),
        RawReference::Number(n) => {
            let id = u32::try_from(*n)
                .ok()
                .filter(|id| *id > 0)
                .ok_or_else(|| IntegrityError::MalformedReference {
                    raw: n.to_string(),
                    reason: format!(
                        "expected a positive integer (dependency of {} in tag '{}')",
                        ctx.owner, ctx.tag
                    ),
                })?;

            match (ctx.owner, ctx.bare_subtask_references) {
                (Reference::Task(_), _) | (Reference::Subtask(..), BareSubtaskReferences::TopLevel) => {
                    Ok(Reference::Task(id))
                }
                (Reference::Subtask(parent, _), BareSubtaskReferences::Sibling) => {
                    Ok(Reference::Subtask(parent, id))
                }
                (Reference::Subtask(..), BareSubtaskReferences::Reject) => {
                    Err(IntegrityError::MalformedReference {
                        raw: n.to_string(),
                        reason: format!(
                            "bare integers are not accepted in subtask {}; use \"parent.sub\" or \"task\"",
                            ctx.owner
                        ),
                    })
                }
            }
        }
    }
}

/// Canonical stored form of a reference for the given owner.
///
/// A top-level reference is a plain integer from a task and a numeric string
/// from a subtask, so it never reads back as a sibling.
pub fn encode(reference: Reference, ctx: &ReferenceContext<'_>) -> RawReference {
    match (reference, ctx.owner) {
        (Reference::Task(id), Reference::Task(_)) => RawReference::Number(i64::from(id)),
        (Reference::Task(id), Reference::Subtask(..)) => RawReference::Text(id.to_string()),
        (Reference::Subtask(parent, id), _) => RawReference::Text(format!("{parent}.{id}")),
    }
}

/// Keep `raw` when it already reads as `target` for the owner, else re-encode.
pub fn reencode(raw: &RawReference, target: Reference, ctx: &ReferenceContext<'_>) -> RawReference {
    match normalize(raw, ctx) {
        Ok(current) if current == target => raw.clone(),
        _ => encode(target, ctx),
    }
}
