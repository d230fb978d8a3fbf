//! Unit tests for the PIN container and policy.

use rstest::rstest;

use super::*;

#[test]
fn buffer_capacity_covers_apdu_and_padding() {
    assert_eq!(PIN_BUFFER_CAPACITY, 21);
    let buffer = PinBuffer::new();
    assert_eq!(buffer.backing_storage().len(), PIN_BUFFER_CAPACITY);
}

#[test]
fn digits_are_held_in_entry_order() {
    let buffer = PinBuffer::from_digits("1234").expect("four digits fit");
    assert_eq!(buffer.as_bytes(), b"1234");
    assert_eq!(buffer.len(), 4);
}

#[test]
fn push_rejects_a_thirteenth_byte() {
    let mut buffer = PinBuffer::from_digits("123456789012").expect("twelve digits fit");
    assert_eq!(
        buffer.push(b'3'),
        Err(CardError::UnsupportedPinLength { max_length: 12 })
    );
    // The rejected byte must not have landed in storage.
    assert_eq!(buffer.len(), MAX_PIN_LENGTH);
}

#[test]
fn wipe_zeroes_every_backing_byte() {
    let mut buffer = PinBuffer::from_digits("98765").expect("five digits fit");
    buffer.wipe();
    assert!(buffer.is_empty());
    assert_eq!(buffer.backing_storage(), &[0u8; PIN_BUFFER_CAPACITY]);
}

#[test]
fn debug_output_never_contains_digits() {
    let buffer = PinBuffer::from_digits("4321").expect("four digits fit");
    let rendered = format!("{buffer:?}");
    assert!(!rendered.contains("4321"));
    assert!(rendered.contains("length"));
}

#[rstest]
#[case::estonian_id(4, 12, 3, false)]
#[case::pad_reader(6, 8, 3, true)]
fn policy_accepts_supported_lengths(
    #[case] min: u8,
    #[case] max: u8,
    #[case] retries: u8,
    #[case] pad: bool,
) {
    let policy = PinPolicy::new(min, max, retries, pad).expect("policy within limits");
    assert_eq!(policy.min_length(), min);
    assert_eq!(policy.max_length(), max);
    assert_eq!(policy.retries_left(), retries);
    assert_eq!(policy.pin_pad(), pad);
}

#[test]
fn policy_rejects_oversized_maximum() {
    assert_eq!(
        PinPolicy::new(4, 16, 3, false),
        Err(CardError::UnsupportedPinLength { max_length: 16 })
    );
}
