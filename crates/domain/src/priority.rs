use std::cmp::Ordering;

use crate::Lead;

/// Compares two leads for distribution, best candidate first.
///
/// Ranking keys, in order: numeric score descending, `updated_at` descending
/// (recently touched leads stay warm), `created_at` ascending (oldest backlog
/// wins remaining ties), lead id ascending as the final disambiguator so the
/// order is total over distinct leads.
///
/// The `ORDER BY` clause of the Postgres claim query mirrors these keys; the
/// two must stay in lockstep.
#[must_use]
pub fn compare_priority(a: &Lead, b: &Lead) -> Ordering {
    b.priority_score()
        .total_cmp(&a.priority_score())
        .then_with(|| b.updated_at().cmp(&a.updated_at()))
        .then_with(|| a.created_at().cmp(&b.created_at()))
        .then_with(|| a.id().cmp(&b.id()))
}

/// Returns the best candidate among `leads` per [`compare_priority`].
///
/// Read-only; callers own making selection and claim one atomic unit.
#[must_use]
pub fn select_best<'a, I>(leads: I) -> Option<&'a Lead>
where
    I: IntoIterator<Item = &'a Lead>,
{
    leads
        .into_iter()
        .min_by(|a, b| compare_priority(a, b))
}
