use crate::core::country::CountryCode;

/// Produce up to two alternative three-node routes `[s, hub, d]` by
/// inserting hubs from `hub_order` between the endpoints of `route`,
/// skipping any hub equal to the source, the destination, or already
/// present on `route` (§4.4 Quote-alternates).
pub fn quote_alternates(route: &[CountryCode], hub_order: &[CountryCode]) -> Vec<Vec<CountryCode>> {
    let (Some(source), Some(target)) = (route.first(), route.last()) else {
        return Vec::new();
    };

    hub_order
        .iter()
        .filter(|hub| *hub != source && *hub != target && !route.contains(hub))
        .take(2)
        .map(|hub| vec![source.clone(), hub.clone(), target.clone()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_hub_order;

    fn route(codes: &[&str]) -> Vec<CountryCode> {
        codes.iter().map(|c| CountryCode::new(*c)).collect()
    }

    #[test]
    fn produces_two_alternatives_in_hub_order() {
        let r = route(&["BRA", "MEX"]);
        let alts = quote_alternates(&r, &default_hub_order());
        assert_eq!(alts.len(), 2);
        assert_eq!(
            alts[0],
            vec![CountryCode::new("BRA"), CountryCode::new("USA"), CountryCode::new("MEX")]
        );
        assert_eq!(
            alts[1],
            vec![CountryCode::new("BRA"), CountryCode::new("GBR"), CountryCode::new("MEX")]
        );
    }

    #[test]
    fn skips_hubs_already_on_route_or_equal_to_endpoints() {
        let r = route(&["USA", "GBR", "MEX"]);
        let alts = quote_alternates(&r, &default_hub_order());
        assert_eq!(
            alts[0],
            vec![CountryCode::new("USA"), CountryCode::new("HKG"), CountryCode::new("MEX")]
        );
    }

    #[test]
    fn empty_route_yields_no_alternatives() {
        assert!(quote_alternates(&[], &default_hub_order()).is_empty());
    }

    #[test]
    fn exhausted_hub_list_yields_fewer_than_two() {
        let r = route(&["USA", "GBR"]);
        let hubs = vec![CountryCode::new("USA"), CountryCode::new("GBR")];
        assert!(quote_alternates(&r, &hubs).is_empty());
    }
}
