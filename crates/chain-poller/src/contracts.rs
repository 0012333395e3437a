use alloy_primitives::Address;
use cohort_primitives::{core_contracts, ChainId};

/// Contracts whose logs the poller fetches on `chain_id`.
///
/// Core deployments for the chain come first, followed by `extra` in order. Duplicates are
/// dropped so a contract listed twice is never queried twice per block.
pub fn interesting_contracts(chain_id: ChainId, extra: &[Address]) -> Vec<Address> {
    let mut out: Vec<Address> = Vec::new();
    let core = core_contracts(chain_id).into_iter().flat_map(|c| c.addresses());
    for addr in core.chain(extra.iter().copied()) {
        if !out.contains(&addr) {
            out.push(addr);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_then_extra_without_duplicates() {
        let core: Vec<_> = core_contracts(ChainId::ETHEREUM_ANVIL)
            .unwrap()
            .addresses()
            .collect();
        let extra = [Address::repeat_byte(9), core[0], Address::repeat_byte(9)];

        let got = interesting_contracts(ChainId::ETHEREUM_ANVIL, &extra);
        assert_eq!(got, vec![core[0], core[1], Address::repeat_byte(9)]);
    }

    #[test]
    fn test_unknown_chain_uses_only_extra() {
        let got = interesting_contracts(ChainId::new(5), &[Address::repeat_byte(1)]);
        assert_eq!(got, vec![Address::repeat_byte(1)]);
    }
}
