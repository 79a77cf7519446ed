//! Property-based tests for the structural merger

use proptest::prelude::*;
use sendscript::job::{JobSpec, NodeRequest};
use sendscript::merge::{is_mergeable, merge, MergePolicy};

fn node() -> impl Strategy<Value = NodeRequest> {
    (1u32..4, 1u32..16, proptest::option::of("[a-z]{1,6}")).prop_map(|(count, ppn, name)| {
        NodeRequest {
            name,
            count,
            processors_per_node: ppn,
            extra_features: Vec::new(),
        }
    })
}

fn job_spec() -> impl Strategy<Value = JobSpec> {
    (
        proptest::option::of("[a-z]{1,8}"),
        proptest::option::of(1u64..1_000_000),
        proptest::option::of(1u64..(1 << 40)),
        proptest::option::of(any::<bool>()),
        proptest::option::of(-1024i32..1024),
        proptest::collection::vec(node(), 0..3),
    )
        .prop_map(|(name, walltime, memory, begin, priority, nodes)| {
            let mut spec = JobSpec::new();
            spec.job_name = name;
            spec.walltime = walltime;
            spec.physical_memory = memory;
            spec.send_email_on.begin = begin;
            spec.priority = priority;
            spec.nodes = nodes;
            spec
        })
}

fn policy() -> impl Strategy<Value = MergePolicy> {
    prop_oneof![Just(MergePolicy::FILL_GAPS), Just(MergePolicy::OVERRIDE)]
}

/// Merging a specification into itself changes nothing, under every policy
#[test]
fn test_merge_idempotence_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(job_spec(), policy()), |(spec, policy)| {
            let mut receiver = spec.clone();
            prop_assert!(merge(&mut receiver, &spec, policy).is_ok());
            prop_assert_eq!(receiver, spec);
            Ok(())
        })
        .unwrap();
}

/// Merging into an empty specification yields the sender
#[test]
fn test_merge_into_empty_copies_sender_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(job_spec(), policy()), |(sender, policy)| {
            let mut receiver = JobSpec::new();
            prop_assert!(merge(&mut receiver, &sender, policy).is_ok());
            prop_assert_eq!(receiver, sender);
            Ok(())
        })
        .unwrap();
}

/// Under gap filling, set receiver scalars never change and a failed merge
/// leaves the receiver untouched
#[test]
fn test_fill_gaps_never_overwrites_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(job_spec(), job_spec()), |(receiver, sender)| {
            let mut merged = receiver.clone();
            let mergeable = is_mergeable(&receiver, &sender, MergePolicy::FILL_GAPS);
            let result = merge(&mut merged, &sender, MergePolicy::FILL_GAPS);
            prop_assert_eq!(result.is_ok(), mergeable);

            if result.is_err() {
                prop_assert_eq!(merged, receiver);
                return Ok(());
            }
            if receiver.walltime.is_some() {
                prop_assert_eq!(merged.walltime, receiver.walltime);
            }
            if receiver.job_name.is_some() {
                prop_assert_eq!(&merged.job_name, &receiver.job_name);
            }
            if receiver.walltime.is_none() {
                prop_assert_eq!(merged.walltime, sender.walltime);
            }
            Ok(())
        })
        .unwrap();
}

/// Differing set scalars conflict without updates and take the sender's value with them
#[test]
fn test_scalar_conflict_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(1u64..100_000, 1u64..100_000), |(a, b)| {
            prop_assume!(a != b);

            let mut receiver = JobSpec::new();
            receiver.walltime = Some(a);
            let mut sender = JobSpec::new();
            sender.walltime = Some(b);

            let mut filled = receiver.clone();
            prop_assert!(merge(&mut filled, &sender, MergePolicy::FILL_GAPS).is_err());
            prop_assert_eq!(filled.walltime, Some(a));

            let mut overridden = receiver.clone();
            prop_assert!(merge(&mut overridden, &sender, MergePolicy::OVERRIDE).is_ok());
            prop_assert_eq!(overridden.walltime, Some(b));
            Ok(())
        })
        .unwrap();
}

/// Differing node lists are concatenated under gap filling and replaced under override
#[test]
fn test_node_list_extension_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                proptest::collection::vec(node(), 1..3),
                proptest::collection::vec(node(), 1..3),
            ),
            |(a, b)| {
                prop_assume!(a != b);

                let mut receiver = JobSpec::new();
                receiver.nodes = a.clone();
                let mut sender = JobSpec::new();
                sender.nodes = b.clone();

                let mut extended = receiver.clone();
                prop_assert!(merge(&mut extended, &sender, MergePolicy::FILL_GAPS).is_ok());
                let mut expected = a.clone();
                expected.extend(b.iter().cloned());
                prop_assert_eq!(&extended.nodes, &expected);
                prop_assert_eq!(
                    extended.total_processors(),
                    receiver.total_processors() + sender.total_processors()
                );

                let mut replaced = receiver.clone();
                prop_assert!(merge(&mut replaced, &sender, MergePolicy::OVERRIDE).is_ok());
                prop_assert_eq!(&replaced.nodes, &b);
                Ok(())
            },
        )
        .unwrap();
}

/// Equal node lists are left as they are under gap filling, not concatenated
#[test]
fn test_equal_node_lists_are_kept_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&proptest::collection::vec(node(), 1..4), |nodes| {
            let mut receiver = JobSpec::new();
            receiver.nodes = nodes.clone();
            let sender = receiver.clone();

            prop_assert!(merge(&mut receiver, &sender, MergePolicy::FILL_GAPS).is_ok());
            prop_assert_eq!(&receiver.nodes, &nodes);
            prop_assert_eq!(receiver.total_processors(), sender.total_processors());
            Ok(())
        })
        .unwrap();
}
