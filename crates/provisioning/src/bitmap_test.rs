//! Unit tests for the egress bitmap

#[cfg(test)]
mod tests {
    use crate::bitmap::*;

    #[test]
    fn test_bit_positions_at_byte_boundaries() {
        assert_eq!(bit_position(1).unwrap(), (0, 0x80));
        assert_eq!(bit_position(7).unwrap(), (0, 0x02));
        assert_eq!(bit_position(8).unwrap(), (0, 0x01));
        assert_eq!(bit_position(9).unwrap(), (1, 0x80));
        assert_eq!(bit_position(15).unwrap(), (1, 0x02));
        assert_eq!(bit_position(16).unwrap(), (1, 0x01));
    }

    #[test]
    fn test_ifindex_zero_is_rejected() {
        assert!(bit_position(0).is_err());
        assert!(EgressPortList::from_bytes(vec![0xff]).set(0).is_err());
        assert!(EgressPortList::from_bytes(vec![0xff]).clear(0).is_err());
    }

    #[test]
    fn test_set_touches_only_one_byte() {
        let mut list = EgressPortList::from_bytes(vec![0x00, 0x10, 0x00]);
        list.set(9).unwrap();
        assert_eq!(list.as_bytes(), &[0x00, 0x90, 0x00]);
        list.clear(12).unwrap();
        assert_eq!(list.as_bytes(), &[0x00, 0x80, 0x00]);
    }

    #[test]
    fn test_clear_undoes_set_on_zero_bitmap() {
        let zero = EgressPortList::from_bytes(vec![0u8; 256]);
        for ifindex in 1..=2048 {
            let mut list = zero.clone();
            list.set(ifindex).unwrap();
            assert!(list.contains(ifindex));
            list.clear(ifindex).unwrap();
            assert_eq!(list, zero, "ifindex {ifindex}");
        }
    }

    #[test]
    fn test_set_is_idempotent() {
        let base = EgressPortList::from_bytes(vec![0xa5u8; 256]);
        for ifindex in 1..=2048 {
            let mut once = base.clone();
            once.set(ifindex).unwrap();
            let mut twice = once.clone();
            twice.set(ifindex).unwrap();
            assert_eq!(once, twice, "ifindex {ifindex}");
        }
    }

    #[test]
    fn test_short_bitmaps() {
        let mut empty = EgressPortList::default();
        empty.set(10).unwrap();
        assert_eq!(empty.as_bytes(), &[0x00, 0x40]);

        let mut short = EgressPortList::from_bytes(vec![0xff]);
        short.clear(20).unwrap();
        assert_eq!(short.into_bytes(), vec![0xff]);
    }

    #[test]
    fn test_members_lists_set_bits() {
        let list = EgressPortList::from_bytes(vec![0x81, 0x40]);
        assert_eq!(list.members(), vec![1, 8, 10]);
    }
}
