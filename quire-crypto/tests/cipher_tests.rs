use quire_crypto::{decrypt, encrypt, ContentKey, EncryptedData, NONCE_SIZE, TAG_SIZE};

const CHAPTER: &[u8] = b"<html><body><p>It was a bright cold day in April.</p></body></html>";

#[test]
fn publication_resource_opens_with_its_content_key() {
    let key = ContentKey::generate();
    let sealed = encrypt(key.secret(), CHAPTER).unwrap();
    assert_eq!(decrypt(key.secret(), &sealed).unwrap(), CHAPTER);
}

#[test]
fn another_content_key_cannot_open_resource() {
    let sealed = encrypt(ContentKey::generate().secret(), CHAPTER).unwrap();
    assert!(decrypt(ContentKey::generate().secret(), &sealed).is_err());
}

#[test]
fn every_seal_uses_a_fresh_nonce() {
    let key = ContentKey::generate();
    let a = encrypt(key.secret(), CHAPTER).unwrap();
    let b = encrypt(key.secret(), CHAPTER).unwrap();
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn empty_resource_still_carries_a_tag() {
    let key = ContentKey::generate();
    let sealed = encrypt(key.secret(), b"").unwrap();
    assert!(!sealed.is_empty());
    assert_eq!(sealed.len(), NONCE_SIZE + TAG_SIZE);
    assert!(decrypt(key.secret(), &sealed).unwrap().is_empty());
}

#[test]
fn flipped_tag_bit_is_detected() {
    let key = ContentKey::generate();
    let mut bytes = encrypt(key.secret(), CHAPTER).unwrap().to_bytes();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    let sealed = EncryptedData::from_bytes(&bytes).unwrap();
    assert!(decrypt(key.secret(), &sealed).is_err());
}

// ── Framing ──────────────────────────────────────────────────────

#[test]
fn serialized_blob_starts_with_nonce() {
    let key = ContentKey::generate();
    let sealed = encrypt(key.secret(), CHAPTER).unwrap();
    let bytes = sealed.to_bytes();

    assert_eq!(bytes.len(), NONCE_SIZE + CHAPTER.len() + TAG_SIZE);
    assert_eq!(&bytes[..NONCE_SIZE], &sealed.nonce);
    assert_eq!(EncryptedData::from_bytes(&bytes).unwrap(), sealed);
}

#[test]
fn embedded_blob_tolerates_surrounding_whitespace() {
    let key = ContentKey::generate();
    let sealed = encrypt(key.secret(), b"k").unwrap();
    let embedded = format!("  {}\n", sealed.to_base64());
    assert_eq!(EncryptedData::from_base64(&embedded).unwrap(), sealed);
}

#[test]
fn minimum_blob_length() {
    assert!(EncryptedData::from_bytes(&[0u8; NONCE_SIZE + TAG_SIZE - 1]).is_err());
    assert!(EncryptedData::from_bytes(&[0u8; NONCE_SIZE + TAG_SIZE]).is_ok());
}

#[test]
fn non_base64_blob_is_rejected() {
    assert!(EncryptedData::from_base64("key check?").is_err());
}
