use proptest::prelude::*;

use sentinel_envelope::{aead_open, aead_seal, generate_iv, unwrap, wrap, KEY_LEN};

fn arb_key() -> impl Strategy<Value = [u8; KEY_LEN]> {
    prop::array::uniform32(any::<u8>())
}

proptest! {
    #[test]
    fn seal_open_roundtrips(
        key in arb_key(),
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
        aad in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let iv = generate_iv().unwrap();
        let ct = aead_seal(&key, &iv, &plaintext, &aad).unwrap();
        let pt = aead_open(&key, &iv, &ct, &aad).unwrap();
        prop_assert_eq!(pt, plaintext);
    }

    #[test]
    fn seal_open_fails_on_any_aad_change(
        key in arb_key(),
        plaintext in prop::collection::vec(any::<u8>(), 0..128),
        aad in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let iv = generate_iv().unwrap();
        let ct = aead_seal(&key, &iv, &plaintext, &aad).unwrap();
        let mut bad_aad = aad.clone();
        bad_aad[0] ^= 0x01;
        prop_assert!(aead_open(&key, &iv, &ct, &bad_aad).is_err());
    }

    #[test]
    fn seal_open_fails_on_ciphertext_bitflip(
        key in arb_key(),
        plaintext in prop::collection::vec(any::<u8>(), 1..128),
        aad in prop::collection::vec(any::<u8>(), 0..64),
        flip_index in 0usize..128,
    ) {
        let iv = generate_iv().unwrap();
        let mut ct = aead_seal(&key, &iv, &plaintext, &aad).unwrap();
        let idx = flip_index % ct.len();
        ct[idx] ^= 0x01;
        prop_assert!(aead_open(&key, &iv, &ct, &aad).is_err());
    }

    #[test]
    fn seal_open_fails_on_iv_bitflip(
        key in arb_key(),
        plaintext in prop::collection::vec(any::<u8>(), 0..128),
        aad in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let iv = generate_iv().unwrap();
        let ct = aead_seal(&key, &iv, &plaintext, &aad).unwrap();
        let mut bad_iv = iv;
        bad_iv[0] ^= 0x01;
        prop_assert!(aead_open(&key, &bad_iv, &ct, &aad).is_err());
    }

    #[test]
    fn wrap_unwrap_roundtrips(master in arb_key(), data_key in arb_key()) {
        let wrapped = wrap(&master, &data_key).unwrap();
        let recovered = unwrap(&master, &wrapped).unwrap();
        prop_assert_eq!(*recovered, data_key);
    }

    #[test]
    fn wrap_unwrap_fails_under_wrong_master_key(
        master in arb_key(),
        other_master in arb_key(),
        data_key in arb_key(),
    ) {
        prop_assume!(master != other_master);
        let wrapped = wrap(&master, &data_key).unwrap();
        prop_assert!(unwrap(&other_master, &wrapped).is_err());
    }
}
