//! Structural Merge
//!
//! Reconciles two records of the same schema field by field. Which fields
//! exist, and whether each is a scalar or an appendable sequence, is declared
//! by the record itself through [`Mergeable::merge_fields`]; the decision tree
//! applied to every field lives here and is parameterized by a [`MergePolicy`].
//!
//! Per field, in order:
//! 1. sender unset: keep the receiver's value
//! 2. receiver unset: take the sender's value
//! 3. both equal: nothing to do
//! 4. appendable sequence and list extension allowed: append the sender's elements
//! 5. updates allowed: overwrite with the sender's value
//! 6. otherwise: conflict naming the field
//!
//! Merging is atomic: on conflict the receiver is left untouched.

use crate::error::MergeError;
use tracing::trace;

/// How conflicting fields are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// Overwrite receiver values that differ from the sender's
    pub allow_updates: bool,
    /// Append sender elements to appendable sequences instead of comparing them
    pub allow_list_extend: bool,
}

impl MergePolicy {
    /// Fill gaps and extend lists; differing scalars conflict.
    pub const FILL_GAPS: MergePolicy = MergePolicy {
        allow_updates: false,
        allow_list_extend: true,
    };

    /// Sender wins on any difference; lists are replaced, not extended.
    pub const OVERRIDE: MergePolicy = MergePolicy {
        allow_updates: true,
        allow_list_extend: false,
    };
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self::FILL_GAPS
    }
}

/// Declared kind of a mergeable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    AppendableSequence,
}

/// Schema marker of a mergeable record.
///
/// A sender may be merged into a receiver only if the sender's schema is the
/// receiver's schema or extends it.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub extends: Option<&'static Schema>,
}

impl Schema {
    pub const fn root(name: &'static str) -> Self {
        Self {
            name,
            extends: None,
        }
    }

    pub const fn extending(name: &'static str, parent: &'static Schema) -> Self {
        Self {
            name,
            extends: Some(parent),
        }
    }

    /// True if `self` is `other` or (transitively) extends it
    pub fn conforms_to(&self, other: &Schema) -> bool {
        let mut current = Some(self);
        while let Some(schema) = current {
            if schema.name == other.name {
                return true;
            }
            current = schema.extends;
        }
        false
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Schema {}

/// A field value with a notion of being unset
pub trait Slot: Clone + PartialEq {
    fn is_unset(&self) -> bool;
}

impl<T: Clone + PartialEq> Slot for Option<T> {
    fn is_unset(&self) -> bool {
        self.is_none()
    }
}

/// An empty sequence counts as unset.
impl<T: Clone + PartialEq> Slot for Vec<T> {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

/// A record that can take part in a structural merge
pub trait Mergeable: Clone {
    fn schema(&self) -> &'static Schema;

    /// Hand every field pair to `merger`, declaring each as scalar, sequence or nested record.
    fn merge_fields(&mut self, sender: &Self, merger: &mut FieldMerger) -> Result<(), MergeError>;
}

/// Applies the per-field decision tree under one policy.
pub struct FieldMerger {
    policy: MergePolicy,
    path: Vec<&'static str>,
}

impl FieldMerger {
    fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            path: Vec::new(),
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    fn field_path(&self, name: &str) -> String {
        let mut parts: Vec<&str> = self.path.clone();
        parts.push(name);
        parts.join(".")
    }

    /// Reconcile a scalar field.
    pub fn scalar<T: Slot>(
        &mut self,
        name: &'static str,
        receiver: &mut T,
        sender: &T,
    ) -> Result<(), MergeError> {
        self.reconcile(name, FieldKind::Scalar, receiver, sender, |_, _| {})
    }

    /// Reconcile an appendable sequence field.
    pub fn sequence<T: Clone + PartialEq>(
        &mut self,
        name: &'static str,
        receiver: &mut Vec<T>,
        sender: &Vec<T>,
    ) -> Result<(), MergeError> {
        self.reconcile(
            name,
            FieldKind::AppendableSequence,
            receiver,
            sender,
            |recv, send| recv.extend(send.iter().cloned()),
        )
    }

    /// Reconcile a nested record field by field.
    pub fn nested<M: Mergeable>(
        &mut self,
        name: &'static str,
        receiver: &mut M,
        sender: &M,
    ) -> Result<(), MergeError> {
        self.path.push(name);
        let result = receiver.merge_fields(sender, self);
        self.path.pop();
        result
    }

    fn reconcile<T: Slot>(
        &mut self,
        name: &'static str,
        kind: FieldKind,
        receiver: &mut T,
        sender: &T,
        extend: impl FnOnce(&mut T, &T),
    ) -> Result<(), MergeError> {
        if sender.is_unset() {
            return Ok(());
        }

        if receiver.is_unset() {
            trace!(field = %self.field_path(name), "filled unset field");
            *receiver = sender.clone();
            return Ok(());
        }

        if receiver == sender {
            return Ok(());
        }

        if kind == FieldKind::AppendableSequence && self.policy.allow_list_extend {
            trace!(field = %self.field_path(name), "extended sequence");
            extend(receiver, sender);
            return Ok(());
        }

        if self.policy.allow_updates {
            trace!(field = %self.field_path(name), "overwrote field");
            *receiver = sender.clone();
            return Ok(());
        }

        Err(MergeError::FieldConflict {
            field: self.field_path(name),
        })
    }
}

/// Merge `sender` into `receiver` under `policy`.
///
/// On error the receiver is unchanged.
pub fn merge<M: Mergeable>(
    receiver: &mut M,
    sender: &M,
    policy: MergePolicy,
) -> Result<(), MergeError> {
    let receiver_schema = receiver.schema();
    let sender_schema = sender.schema();
    if !sender_schema.conforms_to(receiver_schema) {
        return Err(MergeError::TypeMismatch {
            receiver: receiver_schema.name,
            sender: sender_schema.name,
        });
    }

    let mut staged = receiver.clone();
    let mut merger = FieldMerger::new(policy);
    staged.merge_fields(sender, &mut merger)?;
    *receiver = staged;
    Ok(())
}

/// Dry run of [`merge`]: true if merging would succeed.
pub fn is_mergeable<M: Mergeable>(receiver: &M, sender: &M, policy: MergePolicy) -> bool {
    let mut probe = receiver.clone();
    merge(&mut probe, sender, policy).is_ok()
}
