use form_model::ident::{GroupedId, detransform, is_group_eligible, transform};
use proptest::prelude::*;

fn template_id() -> impl Strategy<Value = String> {
    (
        "[a-z]{1,6}",
        proptest::collection::vec("[A-Za-z]{1,8}", 0..3),
        "[A-Z]{2,10}",
    )
        .prop_map(|(prefix, containers, leaf)| {
            let mut id = format!("ctl00_{prefix}");
            for container in containers {
                id.push_str(&format!("_dtl{container}_ctl00"));
            }
            id.push_str(&format!("_dtl_ctl00_tbx{leaf}"));
            id
        })
}

proptest! {
    #[test]
    fn transform_is_invertible(id in template_id(), index in 1usize..500) {
        let clone = transform(&id, index);
        prop_assert_ne!(&clone, &id);
        prop_assert_eq!(detransform(&clone), (id.clone(), index));
    }

    #[test]
    fn index_zero_leaves_identifier_alone(id in template_id()) {
        prop_assert_eq!(transform(&id, 0), id.clone());
        prop_assert_eq!(detransform(&id), (id, 0));
    }

    #[test]
    fn retransforming_only_touches_last_token(id in template_id(), a in 1usize..100, b in 1usize..100) {
        let twice = transform(&transform(&id, a), b);
        prop_assert_eq!(twice, transform(&id, b));
    }

    #[test]
    fn grouped_id_encodes_what_it_parses(id in template_id(), index in 0usize..100) {
        let concrete = transform(&id, index);
        let grouped = GroupedId::parse(&concrete);
        prop_assert_eq!(grouped.template(), id.as_str());
        prop_assert_eq!(grouped.encode(), concrete);
    }
}

#[test]
fn identifiers_without_tokens_are_not_eligible() {
    assert!(!is_group_eligible("tbxSURNAME"));
    assert_eq!(transform("tbxSURNAME", 4), "tbxSURNAME");
    assert_eq!(detransform("tbxSURNAME"), ("tbxSURNAME".to_string(), 0));
}
