use proptest::prelude::*;

use dhcpd_leases::lexer::Lexer;
use dhcpd_leases::{Config, Duid, IaidDuid, octal, parse_v4, parse_v6};

const LEASE_FRAGMENTS: &[&str] = &[
    "lease",
    "ia-na",
    "ia-pd",
    "iaaddr",
    "iaprefix",
    "10.0.0.1",
    "2001:db8::1",
    "2001:db8::/64",
    "{",
    "}",
    ";",
    "=",
    "set",
    "starts",
    "ends",
    "never",
    "3",
    "2023/01/01",
    "00:00:00",
    "binding",
    "state",
    "active",
    "uid",
    "\"\\001\\002\"",
    "\"\\276\\257\\244\\320\\000\\003\\000\\001 \\311\\320\\244\\257\\276\"",
    "max-life",
    "600",
    "#",
    "\n",
    " ",
];

fn lease_like_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(LEASE_FRAGMENTS), 0..64)
        .prop_map(|fragments| fragments.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    #[test]
    fn lexer_never_panics_on_arbitrary_bytes(data: Vec<u8>) {
        for token in Lexer::new(data.as_slice()) {
            if token.is_err() {
                break;
            }
        }
    }

    #[test]
    fn parsers_never_panic_on_arbitrary_bytes(data: Vec<u8>) {
        let _ = parse_v4(data.as_slice(), &Config::default()).count();
        let _ = parse_v6(data.as_slice(), &Config::skipping_malformed()).count();
    }

    #[test]
    fn parsers_never_panic_on_lease_like_text(text in lease_like_text()) {
        let _ = parse_v4(text.as_bytes(), &Config::skipping_malformed()).count();
        let _ = parse_v6(text.as_bytes(), &Config::default()).count();
    }

    #[test]
    fn parse_errors_are_always_last(text in lease_like_text()) {
        let results: Vec<_> = parse_v4(text.as_bytes(), &Config::default()).collect();
        if let Some(position) = results.iter().position(|result| result.is_err()) {
            prop_assert_eq!(position, results.len() - 1);
        }
    }

    #[test]
    fn octal_decode_never_panics(text in "\"[\\\\0-9a-z ]{0,24}\"?") {
        let _ = octal::decode(&text);
    }

    #[test]
    fn octal_decode_of_plain_text_is_identity(text in "[a-zA-Z0-9 .:-]{0,32}") {
        let quoted = format!("\"{}\"", text);
        prop_assert_eq!(octal::decode(&quoted).unwrap(), text.as_bytes());
    }

    #[test]
    fn duid_decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..32)) {
        let _ = Duid::decode(&data);
        let _ = IaidDuid::decode(&data);
    }

    #[test]
    fn ll_duids_keep_their_hardware_address(
        iaid in any::<[u8; 4]>(),
        mac in any::<[u8; 6]>(),
    ) {
        let mut bytes = iaid.to_vec();
        bytes.extend_from_slice(&[0x00, 0x03, 0x00, 0x01]);
        bytes.extend_from_slice(&mac);

        let decoded = IaidDuid::decode(&bytes).unwrap();
        prop_assert_eq!(decoded.iaid, iaid);
        let expected_hex = octal::encode_hex(&mac);
        prop_assert_eq!(decoded.duid.hardware_address(), Some(expected_hex.as_str()));
    }

    #[test]
    fn unknown_duid_types_are_rejected(duid_type in 4u16..) {
        let mut bytes = vec![0, 0, 0, 1];
        bytes.extend_from_slice(&duid_type.to_be_bytes());
        bytes.extend_from_slice(&[0, 1, 0xaa, 0xbb]);
        prop_assert!(IaidDuid::decode(&bytes).is_err());
    }

    #[test]
    fn every_well_formed_block_is_emitted(hosts in prop::collection::vec(1u8..255, 0..40)) {
        let text: String = hosts
            .iter()
            .map(|host| format!("lease 10.1.2.{} {{\n  binding state active;\n}}\n", host))
            .collect();
        let leases: Vec<_> = parse_v4(text.as_bytes(), &Config::default())
            .collect::<dhcpd_leases::Result<_>>()
            .unwrap();
        prop_assert_eq!(leases.len(), hosts.len());
        for (lease, host) in leases.iter().zip(&hosts) {
            prop_assert_eq!(lease.ip.octets()[3], *host);
        }
    }
}
