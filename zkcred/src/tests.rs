use crate::{
    credential::{Attribute, Credential, MasterSecret, PseudonymOpening},
    nonce::Nonce,
    predicate::{
        Bound, CredentialPredicate, InequalityOperator, InequalityPredicate, MessagePredicate,
        PrimeEncodingOperator, PrimeEncodingPredicate, PseudonymPredicate, VerifierContext,
        MASTER_SECRET,
    },
    proof::{Proof, SValue},
    proof_spec::ProofSpec,
    prover::Prover,
    schema::{AttributeStructure, CredentialStructure, DataType, IssuanceMode},
    store::{MemoryStore, ObjectRef},
    types::*,
    values::AttributeValue,
    verifier::Verifier,
    Error, Rng, Verification,
};
use zkcred_crypto::proofs::PrimeEncodingResponses;

use test_utils::{int, safe_primes, seeded_rng, GROUP_PRIMES, SAFE_PRIMES_512};

struct Fixture {
    group: GroupParameters,
    store: MemoryStore,
    structure: ObjectRef,
    issuer_key: ObjectRef,
    master_secret: MasterSecret,
    credential: Credential,
}

fn fixture(rng: &mut impl Rng) -> Fixture {
    let params = SystemParameters::for_modulus(1024);
    let group =
        GroupParameters::from_primes(rng, params, int(GROUP_PRIMES[0]), int(GROUP_PRIMES[1]))
            .unwrap();
    let (p, q) = safe_primes(SAFE_PRIMES_512);
    let key_pair = IssuerKeyPair::from_safe_primes(rng, &params, p, q, 4, 0).unwrap();
    let structure = CredentialStructure::new(
        "example.org/member",
        vec![
            AttributeStructure::new("age", 1, IssuanceMode::Known, DataType::Int),
            AttributeStructure::new("secret", 2, IssuanceMode::Hidden, DataType::Int),
        ],
        None,
    )
    .unwrap();

    let master_secret = MasterSecret::new(rng, &params);
    let age = BigInt::from(30);
    let secret = BigInt::from(7777);
    let signature = key_pair
        .sign(
            rng,
            &params,
            &[master_secret.value().clone(), age.clone(), secret.clone()],
        )
        .unwrap();

    let mut store = MemoryStore::new();
    let structure = store.insert_credential_structure(structure);
    let issuer_key = store.insert_issuer_public_key(key_pair.public_key().clone());
    let credential = Credential::new(
        structure.clone(),
        issuer_key.clone(),
        signature,
        vec![
            Attribute::new("age".into(), 1, AttributeValue::Int(age.clone()), age),
            Attribute::new("secret".into(), 2, AttributeValue::Int(secret.clone()), secret),
        ],
        BigInt::zero(),
    );
    Fixture {
        group,
        store,
        structure,
        issuer_key,
        master_secret,
        credential,
    }
}

impl Fixture {
    fn credential_predicate(&self) -> CredentialPredicate {
        CredentialPredicate::new("cred", self.structure.clone(), self.issuer_key.clone())
    }

    fn prover(&self) -> Prover<'_> {
        Prover::new(&self.group, &self.store, &self.master_secret)
            .with_credential("cred", self.credential.clone())
    }

    fn verify(&self, spec: &ProofSpec, proof: &Proof, nonce: &Nonce) -> Verification {
        let context = spec.context(self.group.system(), &self.store).unwrap();
        Verifier::new(&self.group, &self.store)
            .verify(spec, proof, &context, nonce)
            .unwrap()
    }
}

fn prove(
    rng: &mut impl Rng,
    fixture: &Fixture,
    spec: &ProofSpec,
    nonce: &Nonce,
) -> Result<Proof, Error> {
    let context = spec.context(fixture.group.system(), &fixture.store)?;
    fixture.prover().prove(rng, spec, &context, nonce)
}

/// Recompute the contribution of the predicate at `index` alone.
fn recompute_one(
    fixture: &Fixture,
    spec: &ProofSpec,
    proof: &Proof,
    index: usize,
) -> Result<(), Error> {
    let context = VerifierContext {
        params: fixture.group.system(),
        group: &fixture.group,
        store: &fixture.store,
        spec,
        proof,
    };
    spec.predicates()[index].recompute(&context).map(drop)
}

#[test]
fn credential_proof_reveals_only_what_is_asked() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let spec = ProofSpec::new()
        .with(fixture.credential_predicate())
        .reveal("cred.age");
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    let proof = prove(&mut rng, &fixture, &spec, &nonce).unwrap();

    assert_eq!(proof.revealed_value("cred.age"), Some(&BigInt::from(30)));
    assert!(proof.revealed_value("cred.secret").is_none());
    assert!(proof.s_value("cred.age").is_none());
    assert!(matches!(
        proof.s_value("cred.secret"),
        Some(SValue::Identifier(_))
    ));
    assert_eq!(fixture.verify(&spec, &proof, &nonce), Verification::Verified);
}

#[test]
fn tampered_proofs_fail() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let spec = ProofSpec::new()
        .with(fixture.credential_predicate())
        .reveal("cred.age");
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    let proof = prove(&mut rng, &fixture, &spec, &nonce).unwrap();

    let mut response = proof.clone();
    if let Some(SValue::Identifier(s)) = response.s_values.get_mut("cred.secret") {
        *s += 1u32;
    }
    assert_eq!(fixture.verify(&spec, &response, &nonce), Verification::Failed);

    let mut revealed = proof.clone();
    let _ = revealed
        .revealed
        .insert("cred.age".into(), BigInt::from(31));
    assert_eq!(fixture.verify(&spec, &revealed, &nonce), Verification::Failed);

    let mut a_prime = proof.clone();
    if let Some(a) = a_prime.common_values.get_mut("cred.A'") {
        *a += 1u32;
    }
    assert_eq!(fixture.verify(&spec, &a_prime, &nonce), Verification::Failed);

    let mut signature = proof;
    if let Some(SValue::Signature { e, .. }) = signature.s_values.get_mut("cred") {
        *e -= 1u32;
    }
    assert_eq!(fixture.verify(&spec, &signature, &nonce), Verification::Failed);
}

#[test]
fn proofs_are_bound_to_nonce_and_context() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let spec = ProofSpec::new().with(fixture.credential_predicate());
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    let proof = prove(&mut rng, &fixture, &spec, &nonce).unwrap();

    let other_nonce = Nonce::new(&mut rng, fixture.group.system());
    assert_eq!(fixture.verify(&spec, &proof, &other_nonce), Verification::Failed);

    let context = spec.context(fixture.group.system(), &fixture.store).unwrap() + 1u32;
    let verification = Verifier::new(&fixture.group, &fixture.store)
        .verify(&spec, &proof, &context, &nonce)
        .unwrap();
    assert_eq!(verification, Verification::Failed);
}

#[test]
fn oversized_responses_are_rejected() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let spec = ProofSpec::new().with(fixture.credential_predicate());
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    let mut proof = prove(&mut rng, &fixture, &spec, &nonce).unwrap();

    let params = fixture.group.system();
    let too_long = BigInt::one() << (params.response_bits(params.l_m) + 1) as usize;
    let _ = proof
        .s_values
        .insert(MASTER_SECRET.into(), SValue::Identifier(too_long));
    assert_eq!(fixture.verify(&spec, &proof, &nonce), Verification::Failed);
}

#[test]
fn unexplained_values_are_rejected() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let spec = ProofSpec::new().with(fixture.credential_predicate());
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    let mut proof = prove(&mut rng, &fixture, &spec, &nonce).unwrap();
    let _ = proof
        .common_values
        .insert("cred.extra".into(), BigInt::from(5));
    assert_eq!(fixture.verify(&spec, &proof, &nonce), Verification::Failed);
}

#[test]
fn unexplained_responses_are_rejected() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let spec = ProofSpec::new()
        .with(fixture.credential_predicate())
        .reveal("cred.age");
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    let proof = prove(&mut rng, &fixture, &spec, &nonce).unwrap();
    assert_eq!(fixture.verify(&spec, &proof, &nonce), Verification::Verified);

    let mut response = proof.clone();
    let _ = response
        .s_values
        .insert("cred.extra".into(), SValue::Identifier(BigInt::from(5)));
    assert_eq!(fixture.verify(&spec, &response, &nonce), Verification::Failed);

    // A hidden identifier cannot also be revealed.
    let mut hidden = proof.clone();
    let _ = hidden
        .revealed
        .insert("cred.secret".into(), BigInt::from(7777));
    assert_eq!(fixture.verify(&spec, &hidden, &nonce), Verification::Failed);

    let mut revealed = proof;
    let _ = revealed
        .revealed
        .insert("cred.extra".into(), BigInt::from(5));
    assert_eq!(fixture.verify(&spec, &revealed, &nonce), Verification::Failed);
}

#[test]
fn pseudonyms_outside_the_subgroup_are_rejected() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let opening = PseudonymOpening::new(&mut rng, &fixture.group, &fixture.master_secret);
    let spec = ProofSpec::new()
        .with(fixture.credential_predicate())
        .with(PseudonymPredicate::new("session"));
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    let context = spec.context(fixture.group.system(), &fixture.store).unwrap();
    let proof = fixture
        .prover()
        .with_pseudonym("session", opening)
        .prove(&mut rng, &spec, &context, &nonce)
        .unwrap();
    assert!(recompute_one(&fixture, &spec, &proof, 1).is_ok());

    let gamma = fixture.group.modulus().clone();
    let honest = proof.common_values["session.nym"].clone();
    for shifted in vec![&honest + &gamma, &gamma - &honest, -honest.clone()] {
        let mut tampered = proof.clone();
        let _ = tampered.common_values.insert("session.nym".into(), shifted);
        match recompute_one(&fixture, &spec, &tampered, 1) {
            Err(Error::Rejected(reason)) => assert!(reason.contains("subgroup"), "{}", reason),
            other => panic!("expected a subgroup rejection, got {:?}", other),
        }
        assert_eq!(
            fixture.verify(&spec, &tampered, &nonce),
            Verification::Failed
        );
    }
}

fn set_spec(fixture: &Fixture, operator: PrimeEncodingOperator, primes: &[u32]) -> ProofSpec {
    ProofSpec::new()
        .with(fixture.credential_predicate())
        .with(PrimeEncodingPredicate::new(
            "set",
            fixture.issuer_key.clone(),
            "cred.secret",
            operator,
            primes.iter().map(|prime| BigInt::from(*prime)).collect(),
        ))
}

#[test]
fn malformed_set_proofs_fail() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let oversized = BigInt::one() << 4000usize;
    // 7777 = 7 * 11 * 101
    let cases = [
        (PrimeEncodingOperator::And, vec![7, 11]),
        (PrimeEncodingOperator::Or, vec![3, 7]),
        (PrimeEncodingOperator::Not, vec![2, 5]),
    ];
    for (operator, primes) in cases.iter() {
        let spec = set_spec(&fixture, *operator, primes);
        let nonce = Nonce::new(&mut rng, fixture.group.system());
        let proof = prove(&mut rng, &fixture, &spec, &nonce).unwrap();
        assert_eq!(
            fixture.verify(&spec, &proof, &nonce),
            Verification::Verified,
            "{:?}",
            operator
        );

        let mut tampered = proof.clone();
        match tampered.s_values.get_mut("set") {
            Some(SValue::PrimeEncoding(PrimeEncodingResponses::And { quotient, .. })) => {
                *quotient += &oversized
            }
            Some(SValue::PrimeEncoding(PrimeEncodingResponses::Or { divisor, .. })) => {
                *divisor += &oversized
            }
            Some(SValue::PrimeEncoding(PrimeEncodingResponses::Not { a, .. })) => {
                *a += &oversized
            }
            other => panic!("unexpected responses {:?}", other),
        }
        assert!(matches!(
            recompute_one(&fixture, &spec, &tampered, 1),
            Err(Error::Crypto(zkcred_crypto::Error::ResponseOutOfRange { .. }))
        ));
        assert_eq!(
            fixture.verify(&spec, &tampered, &nonce),
            Verification::Failed,
            "{:?}",
            operator
        );
    }
}

#[test]
fn set_membership_needs_the_divisor_range_proof() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let spec = set_spec(&fixture, PrimeEncodingOperator::Or, &[3, 101]);
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    let proof = prove(&mut rng, &fixture, &spec, &nonce).unwrap();
    assert!(proof.common_value("set.D").is_some());
    assert!(proof.common_value("set.D.Tdelta").is_some());
    assert_eq!(fixture.verify(&spec, &proof, &nonce), Verification::Verified);

    let mut missing = proof.clone();
    let _ = missing.common_values.remove("set.D.Tdelta");
    assert!(recompute_one(&fixture, &spec, &missing, 1).is_err());
    assert_eq!(fixture.verify(&spec, &missing, &nonce), Verification::Failed);

    // Swapping the divisor commitment for one of the range squares breaks the opening of D.
    let mut swapped = proof.clone();
    let square = proof.common_values["set.D.T1"].clone();
    let _ = swapped.common_values.insert("set.D".into(), square);
    assert_eq!(fixture.verify(&spec, &swapped, &nonce), Verification::Failed);
}

#[test]
fn message_is_signed_into_the_challenge() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let signed = |message: &str| {
        ProofSpec::new()
            .with(fixture.credential_predicate())
            .with(MessagePredicate::new("msg", message))
    };
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    let proof = prove(&mut rng, &fixture, &signed("pay 10 to bob"), &nonce).unwrap();
    assert_eq!(
        fixture.verify(&signed("pay 10 to bob"), &proof, &nonce),
        Verification::Verified
    );
    assert_eq!(
        fixture.verify(&signed("pay 99 to eve"), &proof, &nonce),
        Verification::Failed
    );
}

#[test]
fn inequality_on_a_hidden_attribute() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let adult = |operator, bound: i64| {
        ProofSpec::new()
            .with(fixture.credential_predicate())
            .with(InequalityPredicate::new(
                "adult",
                fixture.issuer_key.clone(),
                "cred.age",
                operator,
                Bound::Constant(BigInt::from(bound)),
            ))
    };
    let nonce = Nonce::new(&mut rng, fixture.group.system());

    let spec = adult(InequalityOperator::GreaterOrEqual, 18);
    let proof = prove(&mut rng, &fixture, &spec, &nonce).unwrap();
    assert_eq!(fixture.verify(&spec, &proof, &nonce), Verification::Verified);

    // The same proof does not establish a different bound.
    let stricter = adult(InequalityOperator::GreaterOrEqual, 40);
    assert_eq!(fixture.verify(&stricter, &proof, &nonce), Verification::Failed);

    assert!(matches!(
        prove(&mut rng, &fixture, &stricter, &nonce),
        Err(Error::Crypto(zkcred_crypto::Error::PredicateDoesNotHold(_)))
    ));
}

#[test]
fn invalid_specifications_are_refused() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    let refused = |spec: ProofSpec| {
        let err = fixture.prover().commit(&mut seeded_rng(), &spec).unwrap_err();
        assert!(matches!(err, Error::InvalidProofSpec(_)), "{:?}", err);
    };

    refused(
        ProofSpec::new()
            .with(fixture.credential_predicate())
            .reveal(MASTER_SECRET),
    );
    refused(
        ProofSpec::new()
            .with(fixture.credential_predicate())
            .with(fixture.credential_predicate()),
    );
    let early_inequality = InequalityPredicate::new(
        "adult",
        fixture.issuer_key.clone(),
        "cred.age",
        InequalityOperator::Greater,
        Bound::Constant(BigInt::from(17)),
    );
    refused(
        ProofSpec::new()
            .with(early_inequality.clone())
            .with(fixture.credential_predicate()),
    );
    refused(
        ProofSpec::new()
            .with(fixture.credential_predicate())
            .with(early_inequality)
            .reveal("cred.age"),
    );
    refused(
        ProofSpec::new()
            .with(fixture.credential_predicate().with_identifier("age", "adult"))
            .with(MessagePredicate::new("adult", "x")),
    );
    refused(
        ProofSpec::new()
            .with(fixture.credential_predicate().with_identifier("height", "h")),
    );

    // The verifier refuses the same specifications instead of reporting a failed proof.
    let spec = ProofSpec::new()
        .with(fixture.credential_predicate())
        .reveal(MASTER_SECRET);
    let proof = prove(&mut rng, &fixture, &ProofSpec::new(), &nonce).unwrap();
    assert!(matches!(
        Verifier::new(&fixture.group, &fixture.store).verify(
            &spec,
            &proof,
            &BigInt::zero(),
            &nonce
        ),
        Err(Error::InvalidProofSpec(_))
    ));
}

#[test]
fn identifiers_bind_one_value() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let spec = ProofSpec::new().with(
        fixture
            .credential_predicate()
            .with_identifier("age", "x")
            .with_identifier("secret", "x"),
    );
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    assert_eq!(
        prove(&mut rng, &fixture, &spec, &nonce).unwrap_err(),
        Error::IdentifierMismatch("x".into())
    );
}

#[test]
fn missing_inputs_and_objects() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let spec = ProofSpec::new().with(fixture.credential_predicate());
    let empty = Prover::new(&fixture.group, &fixture.store, &fixture.master_secret);
    assert!(matches!(
        empty.commit(&mut rng, &spec),
        Err(Error::MissingInput(_))
    ));

    let unknown = ProofSpec::new().with(CredentialPredicate::new(
        "cred",
        fixture.structure.clone(),
        ObjectRef::credential_structure(
            &CredentialStructure::new("example.org/other", Vec::new(), None).unwrap(),
        ),
    ));
    assert!(matches!(
        fixture.prover().commit(&mut rng, &unknown),
        Err(Error::UnknownObject { .. })
    ));
}

#[test]
fn proofs_survive_serialization() {
    let mut rng = seeded_rng();
    let fixture = fixture(&mut rng);
    let spec = ProofSpec::new()
        .with(fixture.credential_predicate())
        .reveal("cred.age");
    let nonce = Nonce::new(&mut rng, fixture.group.system());
    let proof = prove(&mut rng, &fixture, &spec, &nonce).unwrap();

    let bytes = bincode::serialize(&proof).unwrap();
    let decoded: Proof = bincode::deserialize(&bytes).unwrap();
    assert_eq!(decoded, proof);
    let spec: ProofSpec = bincode::deserialize(&bincode::serialize(&spec).unwrap()).unwrap();
    assert_eq!(fixture.verify(&spec, &decoded, &nonce), Verification::Verified);
}
