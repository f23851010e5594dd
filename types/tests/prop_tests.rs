use proptest::prelude::*;

use whispr_types::{ReportId, ReportStatus, Timestamp, Tokens};

proptest! {
    /// Decimal, hex-prefixed and integer forms of one number normalize alike.
    #[test]
    fn id_representations_agree(n in any::<u64>()) {
        let from_int = ReportId::from(n);
        let from_dec = ReportId::parse(&n.to_string()).unwrap();
        let from_hex = ReportId::parse(&format!("0x{n:x}")).unwrap();
        let from_upper_hex = ReportId::parse(&format!("0X{n:X}")).unwrap();
        prop_assert_eq!(&from_int, &from_dec);
        prop_assert_eq!(&from_int, &from_hex);
        prop_assert_eq!(&from_int, &from_upper_hex);
    }

    /// Leading zeros never change the identity of a numeric id.
    #[test]
    fn id_leading_zeros_ignored(n in any::<u128>(), zeros in 0usize..6) {
        let padded = format!("{}{}", "0".repeat(zeros), n);
        prop_assert_eq!(ReportId::parse(&padded).unwrap(), ReportId::from(n));
        let padded_hex = format!("0x{}{:x}", "0".repeat(zeros), n);
        prop_assert_eq!(ReportId::parse(&padded_hex).unwrap(), ReportId::from(n));
    }

    /// Normalization is idempotent.
    #[test]
    fn id_normalization_idempotent(raw in "[1-9a-zA-Z_-][0-9a-zA-Z_-]{0,23}") {
        let once = ReportId::parse(&raw).unwrap();
        let twice = ReportId::parse(once.as_str()).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// The JSON form of an id always deserializes back to the same id.
    #[test]
    fn id_serde_stable(n in any::<u64>()) {
        let id = ReportId::parse(&format!("0x{n:x}")).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        let back: ReportId = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, id);
    }

    /// Reward never shrinks below the stake for multipliers of at least one.
    #[test]
    fn reward_at_least_stake(stake in 0u64..1_000_000, multiplier in 1u64..1_000) {
        let reward = Tokens::reward_for(Tokens::new(stake), multiplier);
        prop_assert!(reward >= Tokens::new(stake));
        prop_assert_eq!(reward.raw(), stake * multiplier);
    }

    /// Date strings always have the `YYYY-MM-DD` shape.
    #[test]
    fn date_string_shape(secs in 0u64..4_000_000_000) {
        let date = Timestamp::from_secs(secs).date_string();
        prop_assert_eq!(date.len(), 10);
        prop_assert_eq!(&date[4..5], "-");
        prop_assert_eq!(&date[7..8], "-");
    }

    /// Case never matters when parsing a status string.
    #[test]
    fn status_case_insensitive(idx in 0usize..4, upper in any::<bool>()) {
        let status = ReportStatus::ALL[idx];
        let text = if upper {
            status.as_str().to_ascii_uppercase()
        } else {
            status.as_str().to_string()
        };
        prop_assert_eq!(text.parse::<ReportStatus>().unwrap(), status);
    }
}
