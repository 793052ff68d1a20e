use std::sync::Arc;

use plcsql_ast::{Decl, DeclKind, Expr, Scope, Site, SqlType, span};
use plcsql_core::{OpenPlan, Slot, analyze, cursor_decl};
use proptest::prelude::*;

fn params(scope: &Arc<Scope>, n: usize) -> Vec<Arc<Decl>> {
    (0..n)
        .map(|k| {
            Decl::new(
                format!("p{k}"),
                scope,
                span(0, 0),
                DeclKind::ParamIn { ty: SqlType::Int },
            )
        })
        .collect()
}

/// `picks[i]` names parameter `picks[i]` when it is below the parameter
/// count, otherwise a literal host value.
fn host_values(ps: &[Arc<Decl>], site: &Site, picks: &[usize]) -> Vec<Expr> {
    picks
        .iter()
        .map(|&k| match ps.get(k) {
            Some(p) => Expr::id(span(0, 0), p, site),
            None => Expr::int(span(0, 0), k as i32),
        })
        .collect()
}

proptest! {
    #[test]
    fn usage_arrays_agree(n in 0usize..5, picks in prop::collection::vec(0usize..8, 0..10)) {
        let unit = Scope::unit("p");
        let cs = unit.nested("cursor");
        let site = Site::declarations(&cs);
        let ps = params(&cs, n);
        let hv = host_values(&ps, &site, &picks);

        let usage = analyze(&ps, &hv);
        prop_assert_eq!(usage.param_ref_counts.len(), n);
        prop_assert_eq!(usage.used_values_map.len(), hv.len());

        for (i, &entry) in usage.used_values_map.iter().enumerate() {
            if entry < 0 {
                let k = (-entry - 1) as usize;
                prop_assert_eq!(picks[i], k);
            } else {
                prop_assert_eq!(entry as usize, i);
                prop_assert!(picks[i] >= n);
            }
        }
        for (k, &count) in usage.param_ref_counts.iter().enumerate() {
            let uses = usage.used_values_map.iter().filter(|&&e| e == -(k as i32) - 1).count();
            prop_assert_eq!(count as usize, uses);
        }
    }

    #[test]
    fn open_plan_names_one_temp_per_repeated_parameter(
        n in 1usize..5,
        picks in prop::collection::vec(0usize..5, 0..10),
        level in 1u32..6,
    ) {
        let unit = Scope::unit("p");
        let cs = unit.nested("cursor");
        let site = Site::declarations(&cs);
        let ps = params(&cs, n);
        let c = cursor_decl(ps.clone(), "select 1", host_values(&ps, &site, &picks));

        let plan = OpenPlan::new(&c, level);
        prop_assert_eq!(plan.slots.len(), picks.len());
        for (slot, &k) in plan.slots.iter().zip(&picks) {
            match slot {
                Slot::Temp(t) => {
                    prop_assert!(c.param_ref_counts[k] > 1);
                    prop_assert_eq!(t, &format!("a{k}_{level}"));
                }
                Slot::Arg(a) => {
                    prop_assert_eq!(*a, k);
                    prop_assert_eq!(c.param_ref_counts[k], 1);
                }
                Slot::Host(i) => prop_assert!(picks[*i] >= n),
            }
        }
        let temps = plan.temps().count();
        let repeated = c.param_ref_counts.iter().filter(|&&count| count > 1).count();
        prop_assert_eq!(temps, repeated);
    }
}
