//! Shared fixtures for the zkcred test suites.
//!
//! Safe-prime generation dominates key generation time, so tests build issuer and encryption keys
//! from pre-generated safe primes instead.

use num_bigint::BigInt;
use num_traits::Num;
use rand::SeedableRng;

/// Seeded rng for replicable tests.
pub fn seeded_rng() -> (impl rand::CryptoRng + rand::RngCore) {
    const TEST_RNG_SEED: [u8; 32] = *b"NEVER USE THIS FOR ANYTHING REAL";
    rand::rngs::StdRng::from_seed(TEST_RNG_SEED)
}

/// Parse a decimal fixture.
pub fn int(decimal: &str) -> BigInt {
    BigInt::from_str_radix(decimal, 10).expect("fixture is a decimal integer")
}

/// Two 512-bit safe primes whose product has exactly 1024 bits.
pub const SAFE_PRIMES_512: [&str; 2] = [
    "7695604624361457192754529257535735180505514092484849045903336480934465093674837458397357655332782650311581488542823139509812981822843853483315457214505423",
    "12641303981911382902890680949895278264241938737045308912718286285335764679789243294022109560746430278987654924946066773247770376163845875104474205128480979",
];

/// A second, independent pair of 512-bit safe primes.
pub const SAFE_PRIMES_512_ALT: [&str; 2] = [
    "7536990893581759485414992759174395793761555853164437635947142526197875105955668280125878716149888824754672951988499327075776714932885491009653246443279739",
    "13120313197342220929651793853491652032979487228684668929052148442936922555280932706161907908438118203559441267463964914320100294268304352739398271643974719",
];

/// Two 1024-bit safe primes whose product has exactly 2048 bits.
pub const SAFE_PRIMES_1024: [&str; 2] = [
    "112999222406798721931833333849268147102950147022505802460992091535268075816966075936025019040393072433622656802082332622017453223652152214407213664131523248768791241424323195695511370649171095113633627629936307847640285306090631113634417741800808235795531707908047840001483377345590617223758834712434567239787",
    "158218126283803022058272763052592961282611070886277463832369975105412009501787911836441345285708789485799535586247401566715898120530237771587974577040932617172872848004782127708800903991226194641484661672659733240863133805621580218740078978457974326515115078866157890886368182226092934516392787469741089096719",
];

/// A 1632-bit prime `Gamma` with a 256-bit prime `rho` dividing `Gamma - 1`.
pub const GROUP_PRIMES: [&str; 2] = [
    "106396357037471769485878696282886156722274543517912927066309251696219511201132330505189581088856977899527939335758948319802003807659140808376108659500742214281892403233720262352218621649174989950039893112006640941824133403649584203498673782360069340997433791227462027570530546184653973735480251646853377174699069372047324554372463032908138243158684620781250265659251473032650507008970146677174469696060800521204343992600795922860743414525243960795349346471620653264074371516281573515523195207",
    "97440312511954201668337031525120942695900671965103435310202099637300418215179",
];

/// The fixture safe primes as integers.
pub fn safe_primes(fixture: [&str; 2]) -> (BigInt, BigInt) {
    (int(fixture[0]), int(fixture[1]))
}
