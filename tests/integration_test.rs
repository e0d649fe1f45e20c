// Integration tests for registration parsing: attestation object, authenticator
// data, attested credential data and the embedded COSE key
use ciborium::value::Value;
use passkey_core::passkey::cose::labels;
use passkey_core::passkey::{AttestedCredentialData, CredentialBackupPolicy, PasskeySettings};
use passkey_core::testing::builders::{
    AttestationObjectBuilder, AttestedCredentialDataBuilder, AuthenticatorDataBuilder,
    CoseKeyBuilder,
};
use passkey_core::testing::constants::{TEST_AAGUID, TEST_CREDENTIAL_ID};
use passkey_core::testing::fixtures::TestKeyPair;
use passkey_core::{
    decode_credential_public_key, parse_attestation_object, parse_authenticator_data,
    AuthenticatorFlags, CoseAlgorithm, CredentialPolicy, PasskeyError,
};

fn registration(pair: &TestKeyPair, flags: AuthenticatorFlags) -> Vec<u8> {
    let auth_data = AuthenticatorDataBuilder::new()
        .with_flags(flags)
        .with_sign_count(1)
        .with_attested_credential(pair)
        .build();
    let builder = AttestationObjectBuilder::new().with_auth_data(auth_data);
    builder.build()
}

#[test]
fn test_registration_for_every_algorithm() {
    for pair in TestKeyPair::all() {
        let bytes = registration(&pair, AuthenticatorFlags::USER_PRESENT);
        let attestation = parse_attestation_object(&bytes).expect("Should parse attestation");
        assert_eq!(attestation.format, "none");

        let auth_data = attestation
            .parse_authenticator_data()
            .expect("Should parse authenticator data");
        assert_eq!(auth_data.sign_count, 1);

        let credential = auth_data
            .attested_credential_data
            .expect("Should carry attested credential data");
        assert_eq!(credential.aaguid.as_slice(), &TEST_AAGUID);
        assert_eq!(credential.credential_id.as_slice(), TEST_CREDENTIAL_ID);
        assert_eq!(
            credential.credential_public_key.algorithm(),
            pair.algorithm()
        );
        let key_bytes = credential.credential_public_key.canonical_bytes();
        assert_eq!(key_bytes.as_slice(), pair.cose_key().as_slice());
    }
}

#[test]
fn test_minimal_authenticator_data_scenario() {
    // 37 bytes, flags 0x00, signCount 00 00 00 05
    let mut bytes = vec![0u8; 32];
    bytes.push(0x00);
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x05]);

    let data = parse_authenticator_data(&bytes).expect("Should parse 37 bytes");
    assert_eq!(data.sign_count, 5);
    assert!(data.attested_credential_data.is_none());
    assert!(data.extensions.is_none());

    assert!(matches!(
        parse_authenticator_data(&bytes[..36]),
        Err(PasskeyError::InvalidLength {
            expected: 37,
            actual: 36,
            ..
        })
    ));
}

#[test]
fn test_authenticator_data_round_trip() {
    let pair = TestKeyPair::new(CoseAlgorithm::Ps384);
    let bytes = AuthenticatorDataBuilder::new()
        .with_flags(
            AuthenticatorFlags::USER_PRESENT
                | AuthenticatorFlags::USER_VERIFIED
                | AuthenticatorFlags::BACKUP_ELIGIBLE
                | AuthenticatorFlags::BACKED_UP,
        )
        .with_sign_count(u32::MAX)
        .with_attested_credential(&pair)
        .with_extensions(vec![0xa1, 0x63, b'f', b'o', b'o', 0xf5])
        .build();

    let data = parse_authenticator_data(&bytes).expect("Should parse");
    let reparsed = parse_authenticator_data(&data.to_bytes()).expect("Should reparse");
    assert_eq!(reparsed, data);
    assert_eq!(reparsed.sign_count, u32::MAX);
}

#[test]
fn test_partial_consumption_is_never_success() {
    let pair = TestKeyPair::new(CoseAlgorithm::Es256);
    let bytes = AuthenticatorDataBuilder::new()
        .with_attested_credential(&pair)
        .build();
    assert!(parse_authenticator_data(&bytes).is_ok());

    for cut in [1, 2, 10, bytes.len() - 38] {
        assert!(
            parse_authenticator_data(&bytes[..bytes.len() - cut]).is_err(),
            "truncating {cut} bytes should fail"
        );
    }

    let mut extended = bytes;
    extended.push(0xf6);
    assert!(matches!(
        parse_authenticator_data(&extended),
        Err(PasskeyError::TrailingData { .. })
    ));
}

#[test]
fn test_credential_id_bound_scenario() {
    let mut bytes = TEST_AAGUID.to_vec();
    bytes.extend_from_slice(&1024u16.to_be_bytes());
    assert_eq!(
        AttestedCredentialData::parse(&bytes),
        Err(PasskeyError::InvalidCredentialIdLength(1024))
    );

    // Through authenticator data the bound error surfaces unchanged
    let auth_data = AuthenticatorDataBuilder::new()
        .with_attested_credential_bytes(bytes)
        .build();
    assert_eq!(
        parse_authenticator_data(&auth_data),
        Err(PasskeyError::InvalidCredentialIdLength(1024))
    );
}

#[test]
fn test_missing_attestation_fields_scenario() {
    let missing_statement = AttestationObjectBuilder::new().without("attStmt").build();
    let missing_format = AttestationObjectBuilder::new().without("fmt").build();
    let missing_auth_data = AttestationObjectBuilder::new().without("authData").build();

    let errors = [
        parse_attestation_object(&missing_statement).unwrap_err(),
        parse_attestation_object(&missing_format).unwrap_err(),
        parse_attestation_object(&missing_auth_data).unwrap_err(),
    ];
    assert_eq!(errors[0], PasskeyError::MissingAttestationStatement);
    assert_eq!(errors[1], PasskeyError::MissingAttestationStatementFormat);
    assert_eq!(errors[2], PasskeyError::MissingAuthenticatorData);
    assert_eq!(
        errors[0].to_string(),
        "The attestation object did not include an attestation statement"
    );
}

#[test]
fn test_attestation_with_extra_keys_and_packed_statement() {
    let pair = TestKeyPair::new(CoseAlgorithm::Es256);
    let auth_data = AuthenticatorDataBuilder::new()
        .with_attested_credential(&pair)
        .build();
    let statement = Value::Map(vec![
        (Value::Text("alg".to_string()), Value::Integer((-7).into())),
        (
            Value::Text("sig".to_string()),
            Value::Bytes(pair.sign(&auth_data)),
        ),
    ]);
    let bytes = AttestationObjectBuilder::new()
        .with_format("packed")
        .with_statement(statement)
        .with_auth_data(auth_data)
        .with_entry(Value::Text("epAtt".to_string()), Value::Bool(false))
        .build();

    let attestation = parse_attestation_object(&bytes).expect("Should parse");
    assert_eq!(attestation.format, "packed");
    assert!(attestation.attestation_statement.len() > 10);
}

#[test]
fn test_corrupted_key_inside_authenticator_data() {
    let pair = TestKeyPair::new(CoseAlgorithm::Es256);
    let key = pair
        .cose_key_builder()
        .with_bytes(labels::D, pair.private_scalar())
        .build();
    let credential = AttestedCredentialDataBuilder::new(&pair)
        .with_public_key(key)
        .build();
    let auth_data = AuthenticatorDataBuilder::new()
        .with_attested_credential_bytes(credential)
        .build();

    assert_eq!(
        parse_authenticator_data(&auth_data),
        Err(PasskeyError::PrivateKeyDetected)
    );
}

#[test]
fn test_out_of_order_cose_key() {
    let pair = TestKeyPair::new(CoseAlgorithm::Es256);
    let canonical = pair.cose_key();
    let key = decode_credential_public_key(&canonical).expect("Should decode");
    assert_eq!(key.encoded_len(), canonical.len());

    // y before x
    let reordered = CoseKeyBuilder::new()
        .with_int(labels::KTY, 2)
        .with_int(labels::ALG, -7)
        .with_int(labels::CRV, 1)
        .with_bytes(labels::Y, vec![0; 32])
        .with_bytes(labels::X, vec![0; 32])
        .build_unsorted();
    assert_eq!(
        decode_credential_public_key(&reordered),
        Err(PasskeyError::UnexpectedLabel {
            expected: Some(labels::X),
            found: Some(labels::Y)
        })
    );
}

#[test]
fn test_policy_over_registration() {
    let pair = TestKeyPair::new(CoseAlgorithm::Rs256);
    let synced = AuthenticatorFlags::USER_PRESENT
        | AuthenticatorFlags::BACKUP_ELIGIBLE
        | AuthenticatorFlags::BACKED_UP;
    let attestation =
        parse_attestation_object(&registration(&pair, synced)).expect("Should parse");

    let permissive = CredentialPolicy::default();
    assert!(permissive.check_attestation(&attestation).is_ok());

    let device_bound_es256 = CredentialPolicy::from_settings(&PasskeySettings {
        supported_algorithms: vec![-7],
        backup_eligible_policy: CredentialBackupPolicy::Allowed,
        backed_up_policy: CredentialBackupPolicy::Disallowed,
    })
    .expect("Settings should be valid");
    assert!(matches!(
        device_bound_es256.check_attestation(&attestation),
        Err(PasskeyError::BackupPolicyViolation(_))
    ));

    let es256_only = CredentialPolicy::from_settings(&PasskeySettings {
        supported_algorithms: vec![-7],
        ..PasskeySettings::default()
    })
    .expect("Settings should be valid");
    assert_eq!(
        es256_only.check_attestation(&attestation),
        Err(PasskeyError::DisallowedAlgorithm(-257))
    );
}
