//! Cost-based ranking for overload resolution.

use methodgen_core::{GenError, Result, TypeCatalog, TypeHash};

use super::{OverloadMatch, format_types};

/// Find the best match among viable candidates.
///
/// The lowest total cost wins. When several candidates share the lowest
/// cost, a candidate whose parameters are all assignable to every other tied
/// candidate's parameters is more specific and wins; otherwise the call is
/// ambiguous.
pub fn find_best_match<C: TypeCatalog + ?Sized>(
    catalog: &C,
    viable: &[OverloadMatch],
    owner: TypeHash,
    name: &str,
) -> Result<OverloadMatch> {
    let Some(best_cost) = viable.iter().map(|m| m.total_cost).min() else {
        return Err(GenError::MemberNotFound {
            owner: catalog.type_name(owner),
            name: name.to_string(),
            arguments: String::new(),
        });
    };

    let tied: Vec<&OverloadMatch> = viable.iter().filter(|m| m.total_cost == best_cost).collect();
    if let [only] = tied.as_slice() {
        return Ok((*only).clone());
    }

    if let Some(winner) = break_tie(catalog, &tied) {
        return Ok(winner.clone());
    }

    Err(GenError::AmbiguousOverload {
        owner: catalog.type_name(owner),
        name: name.to_string(),
        candidates: tied
            .iter()
            .map(|m| format!("{name}({})", format_types(catalog, &m.param_types)))
            .collect::<Vec<_>>()
            .join(" and "),
    })
}

fn break_tie<'a, C: TypeCatalog + ?Sized>(catalog: &C, tied: &[&'a OverloadMatch]) -> Option<&'a OverloadMatch> {
    let mut winners = tied.iter().filter(|candidate| {
        tied.iter()
            .filter(|other| other.method != candidate.method)
            .all(|other| more_specific(catalog, candidate, other))
    });
    let winner = winners.next()?;
    if winners.next().is_some() {
        return None;
    }
    Some(*winner)
}

fn more_specific<C: TypeCatalog + ?Sized>(catalog: &C, a: &OverloadMatch, b: &OverloadMatch) -> bool {
    a.param_types.len() == b.param_types.len()
        && a.param_types != b.param_types
        && a.param_types
            .iter()
            .zip(&b.param_types)
            .all(|(x, y)| catalog.is_assignable(*x, *y))
}
