mod setup;

use setup::*;
use test_utils::{safe_primes, seeded_rng, SAFE_PRIMES_512, SAFE_PRIMES_512_ALT};
use zkcred::{
    credential::{Credential, MasterSecret, PseudonymOpening},
    predicate::{
        Bound, CommitmentPredicate, CredentialPredicate, DomainPseudonymPredicate,
        EncryptionPredicate, InequalityOperator, InequalityPredicate, PrimeEncodingOperator,
        PrimeEncodingPredicate, PseudonymPredicate,
    },
    proof::Proof,
    proof_spec::ProofSpec,
    prover::Prover,
    schema::{AttributeStructure, CredentialStructure, DataType, IssuanceMode, PrimeEncoding},
    store::ObjectRef,
    values::Values,
    verifier::Verifier,
    Error, Nonce, Verification,
};
use zkcred_crypto::{commitment::CommitmentOpening, encryption::EncryptionKeyPair, BigInt, Rng};

const BIRTH_YEAR: u64 = 1990;
const ACCOUNT: u64 = 555_000_111;

fn roles() -> PrimeEncoding {
    PrimeEncoding::new(
        vec![
            ("admin".to_string(), BigInt::from(2)),
            ("user".to_string(), BigInt::from(3)),
            ("guest".to_string(), BigInt::from(5)),
        ],
        3,
    )
    .unwrap()
}

fn profile_structure() -> CredentialStructure {
    CredentialStructure::new(
        "example.org/profile",
        vec![
            AttributeStructure::new("birth_year", 1, IssuanceMode::Hidden, DataType::Int),
            AttributeStructure::new("roles", 2, IssuanceMode::Hidden, DataType::Enum)
                .with_encoding(roles())
                .unwrap(),
            AttributeStructure::new("account", 3, IssuanceMode::Hidden, DataType::Int),
        ],
        None,
    )
    .unwrap()
}

struct Holder {
    world: World,
    structure: ObjectRef,
    master_secret: MasterSecret,
    credential: Credential,
}

fn holder(rng: &mut impl Rng) -> Holder {
    let mut world = World::new(rng, fast_params(), SAFE_PRIMES_512, 4, 0);
    let structure = world.add_structure(profile_structure());
    let master_secret = MasterSecret::new(rng, world.params());
    let values = Values::new()
        .with("birth_year", int_value(BIRTH_YEAR))
        .with("roles", enum_value(&["user"]))
        .with("account", int_value(ACCOUNT));
    let (credential, _) = world
        .issue(rng, &structure, &master_secret, Values::new(), values)
        .unwrap();
    Holder {
        world,
        structure,
        master_secret,
        credential,
    }
}

impl Holder {
    fn credential_predicate(&self) -> CredentialPredicate {
        CredentialPredicate::new("cred", self.structure.clone(), self.world.issuer_key.clone())
    }

    fn prover(&self) -> Prover<'_> {
        Prover::new(&self.world.group, &self.world.store, &self.master_secret)
            .with_credential("cred", self.credential.clone())
    }

    fn verifier(&self) -> Verifier<'_> {
        Verifier::new(&self.world.group, &self.world.store)
    }

    fn context(&self, spec: &ProofSpec) -> BigInt {
        spec.context(self.world.params(), &self.world.store).unwrap()
    }

    fn roles(&self, operator: PrimeEncodingOperator, values: &[&str]) -> ProofSpec {
        let attribute = profile_structure().attribute("roles").unwrap().clone();
        ProofSpec::new()
            .with(self.credential_predicate())
            .with(
                PrimeEncodingPredicate::for_values(
                    "roles",
                    self.world.issuer_key.clone(),
                    "cred.roles",
                    &attribute,
                    operator,
                    values,
                )
                .unwrap(),
            )
    }
}

fn prove_and_verify(
    rng: &mut impl Rng,
    holder: &Holder,
    prover: &Prover<'_>,
    spec: &ProofSpec,
) -> (Proof, Verification) {
    let nonce = Nonce::new(rng, holder.world.params());
    let context = holder.context(spec);
    let proof = prover.prove(rng, spec, &context, &nonce).unwrap();
    let verification = holder
        .verifier()
        .verify(spec, &proof, &context, &nonce)
        .unwrap();
    (proof, verification)
}

#[test]
fn role_set_operations() {
    let mut rng = seeded_rng();
    let holder = holder(&mut rng);
    let prover = holder.prover();

    for (operator, values) in vec![
        (PrimeEncodingOperator::Or, vec!["admin", "user"]),
        (PrimeEncodingOperator::Not, vec!["admin", "guest"]),
        (PrimeEncodingOperator::And, vec!["user"]),
    ] {
        let spec = holder.roles(operator, &values);
        let (_, verification) = prove_and_verify(&mut rng, &holder, &prover, &spec);
        assert_eq!(verification, Verification::Verified, "{:?} {:?}", operator, values);
    }

    for (operator, values) in vec![
        (PrimeEncodingOperator::Or, vec!["admin", "guest"]),
        (PrimeEncodingOperator::Not, vec!["user"]),
    ] {
        let spec = holder.roles(operator, &values);
        let context = holder.context(&spec);
        let nonce = Nonce::new(&mut rng, holder.world.params());
        assert!(matches!(
            prover.prove(&mut rng, &spec, &context, &nonce),
            Err(Error::Crypto(zkcred_crypto::Error::PredicateDoesNotHold(_)))
        ));
    }
}

#[test]
fn proofs_do_not_transfer_between_statements() {
    let mut rng = seeded_rng();
    let holder = holder(&mut rng);
    let spec = holder.roles(PrimeEncodingOperator::Or, &["admin", "user"]);
    let nonce = Nonce::new(&mut rng, holder.world.params());
    let context = holder.context(&spec);
    let proof = holder.prover().prove(&mut rng, &spec, &context, &nonce).unwrap();

    let other = holder.roles(PrimeEncodingOperator::Or, &["guest", "user"]);
    let verification = holder
        .verifier()
        .verify(&other, &proof, &context, &nonce)
        .unwrap();
    assert_eq!(verification, Verification::Failed);
}

#[test]
fn inequalities_against_constants_and_hidden_values() {
    let mut rng = seeded_rng();
    let holder = holder(&mut rng);
    let prover = holder.prover();
    let issuer_key = holder.world.issuer_key.clone();
    let spec = ProofSpec::new()
        .with(holder.credential_predicate())
        .with(InequalityPredicate::new(
            "adult",
            issuer_key.clone(),
            "cred.birth_year",
            InequalityOperator::LessOrEqual,
            Bound::Constant(BigInt::from(2004)),
        ))
        .with(InequalityPredicate::new(
            "ordered",
            issuer_key,
            "cred.birth_year",
            InequalityOperator::Less,
            Bound::Identifier("cred.account".into()),
        ));
    let (proof, verification) = prove_and_verify(&mut rng, &holder, &prover, &spec);
    assert_eq!(verification, Verification::Verified);
    assert!(proof.common_value("adult.Tdelta").is_some());
    assert!(proof.revealed_value("cred.birth_year").is_none());
}

#[test]
fn pseudonyms_bind_the_master_secret() {
    let mut rng = seeded_rng();
    let holder = holder(&mut rng);
    let group = &holder.world.group;
    let opening = PseudonymOpening::new(&mut rng, group, &holder.master_secret);
    let prover = holder.prover().with_pseudonym("session", opening.clone());
    let spec = ProofSpec::new()
        .with(holder.credential_predicate())
        .with(DomainPseudonymPredicate::new("shop", "shop.example.org"))
        .with(PseudonymPredicate::new("session"));
    let nonce = Nonce::new(&mut rng, holder.world.params());
    let context = holder.context(&spec);
    let proof = prover.prove(&mut rng, &spec, &context, &nonce).unwrap();

    let domain_pseudonym = holder.master_secret.domain_pseudonym(group, "shop.example.org");
    assert_eq!(proof.common_value("shop.nym"), Some(domain_pseudonym.to_bigint()));
    assert_ne!(
        holder
            .master_secret
            .domain_pseudonym(group, "other.example.org"),
        domain_pseudonym
    );
    let verification = holder
        .verifier()
        .with_domain_pseudonym("shop", &domain_pseudonym)
        .with_pseudonym("session", opening.pseudonym())
        .verify(&spec, &proof, &context, &nonce)
        .unwrap();
    assert_eq!(verification, Verification::Verified);

    // Someone else's pseudonym is not proven.
    let stranger = MasterSecret::new(&mut rng, holder.world.params());
    let verification = holder
        .verifier()
        .with_domain_pseudonym("shop", &stranger.domain_pseudonym(group, "shop.example.org"))
        .verify(&spec, &proof, &context, &nonce)
        .unwrap();
    assert_eq!(verification, Verification::Failed);

    // A pseudonym opening of a different master secret cannot be used.
    let foreign = PseudonymOpening::new(&mut rng, group, &stranger);
    let prover = holder.prover().with_pseudonym("session", foreign);
    assert!(prover.prove(&mut rng, &spec, &context, &nonce).is_err());
}

#[test]
fn commitments_and_credentials_share_identifiers() {
    let mut rng = seeded_rng();
    let mut holder = holder(&mut rng);
    let bank = holder.world.add_structure(
        CredentialStructure::new(
            "example.org/bank",
            vec![AttributeStructure::new(
                "number",
                1,
                IssuanceMode::Hidden,
                DataType::Int,
            )],
            None,
        )
        .unwrap(),
    );
    let issue_bank = |rng: &mut _, holder: &Holder, number| {
        holder
            .world
            .issue(
                rng,
                &bank,
                &holder.master_secret,
                Values::new(),
                Values::new().with("number", int_value(number)),
            )
            .unwrap()
            .0
    };
    let matching = issue_bank(&mut rng, &holder, ACCOUNT);
    let different = issue_bank(&mut rng, &holder, ACCOUNT + 1);

    let pk = holder.world.key_pair.public_key().clone();
    let opening =
        CommitmentOpening::new(&mut rng, holder.world.params(), &pk, BigInt::from(ACCOUNT))
            .unwrap();
    let spec = ProofSpec::new()
        .with(holder.credential_predicate().with_identifier("account", "account"))
        .with(
            CredentialPredicate::new("bank", bank.clone(), holder.world.issuer_key.clone())
                .with_identifier("number", "account"),
        )
        .with(CommitmentPredicate::new(
            "escrowed",
            holder.world.issuer_key.clone(),
            "account",
        ));
    let prover = holder
        .prover()
        .with_credential("bank", matching)
        .with_commitment("escrowed", opening.clone());
    let nonce = Nonce::new(&mut rng, holder.world.params());
    let context = holder.context(&spec);
    let proof = prover.prove(&mut rng, &spec, &context, &nonce).unwrap();
    let verification = holder
        .verifier()
        .with_commitment("escrowed", opening.commitment())
        .verify(&spec, &proof, &context, &nonce)
        .unwrap();
    assert_eq!(verification, Verification::Verified);

    let prover = holder
        .prover()
        .with_credential("bank", different)
        .with_commitment("escrowed", opening);
    assert_eq!(
        prover.prove(&mut rng, &spec, &context, &nonce).unwrap_err(),
        Error::IdentifierMismatch("account".into())
    );
}

#[test]
fn verifiable_encryption_of_a_hidden_attribute() {
    let mut rng = seeded_rng();
    let mut holder = holder(&mut rng);
    let (p, q) = safe_primes(SAFE_PRIMES_512_ALT);
    let escrow =
        EncryptionKeyPair::from_safe_primes(&mut rng, holder.world.params(), p, q).unwrap();
    let escrow_key = holder
        .world
        .store
        .insert_encryption_public_key(escrow.public_key().clone());

    let labelled = |label: u64| {
        ProofSpec::new()
            .with(holder.credential_predicate())
            .with(EncryptionPredicate::new(
                "escrow",
                escrow_key.clone(),
                "cred.account",
                BigInt::from(label),
            ))
    };
    let spec = labelled(7);
    let (proof, verification) = prove_and_verify(&mut rng, &holder, &holder.prover(), &spec);
    assert_eq!(verification, Verification::Verified);

    let ciphertext = proof.ciphertext("escrow").unwrap();
    assert_eq!(ciphertext.label(), &BigInt::from(7));
    assert_eq!(
        escrow.decrypt(holder.world.params(), ciphertext),
        Some(BigInt::from(ACCOUNT))
    );

    // The label is part of the statement.
    let relabelled = labelled(8);
    let nonce = Nonce::new(&mut rng, holder.world.params());
    let context = holder.context(&spec);
    let proof = holder.prover().prove(&mut rng, &spec, &context, &nonce).unwrap();
    let verification = holder
        .verifier()
        .verify(&relabelled, &proof, &context, &nonce)
        .unwrap();
    assert_eq!(verification, Verification::Failed);
}

#[test]
fn corrupted_proofs_fail() {
    let mut rng = seeded_rng();
    let holder = holder(&mut rng);
    let spec = holder.roles(PrimeEncodingOperator::Or, &["admin", "user"]);
    let nonce = Nonce::new(&mut rng, holder.world.params());
    let context = holder.context(&spec);
    let proof = holder.prover().prove(&mut rng, &spec, &context, &nonce).unwrap();
    let bytes = bincode::serialize(&proof).unwrap();

    let step = bytes.len() / 24 + 1;
    for offset in (0..bytes.len()).step_by(step) {
        let mut corrupted = bytes.clone();
        corrupted[offset] ^= 0x10;
        if let Ok(corrupted) = bincode::deserialize::<Proof>(&corrupted) {
            let verification = holder
                .verifier()
                .verify(&spec, &corrupted, &context, &nonce)
                .unwrap();
            assert_eq!(verification, Verification::Failed, "flipped byte {}", offset);
        }
    }
}

#[test]
fn proofs_round_trip_through_json() {
    let mut rng = seeded_rng();
    let holder = holder(&mut rng);
    let spec = holder.roles(PrimeEncodingOperator::Not, &["guest"]);
    let nonce = Nonce::new(&mut rng, holder.world.params());
    let context = holder.context(&spec);
    let proof = holder.prover().prove(&mut rng, &spec, &context, &nonce).unwrap();

    let proof: Proof = serde_json::from_str(&serde_json::to_string(&proof).unwrap()).unwrap();
    let spec: ProofSpec = serde_json::from_str(&serde_json::to_string(&spec).unwrap()).unwrap();
    let verification = holder
        .verifier()
        .verify(&spec, &proof, &context, &nonce)
        .unwrap();
    assert_eq!(verification, Verification::Verified);
}
