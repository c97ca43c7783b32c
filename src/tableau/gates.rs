//! The named-gate registry: canonical names, aliases, inverse names, and the
//! small (1- or 2-qubit) tableau each gate corresponds to.
//!
//! Arbitrary-width gate application is handled generically by
//! `Tableau::embed_into` + `Tableau::then` in `tableau::core` — this module
//! only needs to state each gate's action on its own qubit(s).

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::pauli::PauliStringOwned;
use crate::tableau::core::Tableau;

pub struct GateEntry {
    pub canonical_name: &'static str,
    pub inverse_name: &'static str,
    pub tableau: Tableau,
}

fn single_qubit(x_image: (u8, bool), z_image: (u8, bool)) -> Tableau {
    let mut t = Tableau::identity(1);
    let mut x = PauliStringOwned::identity(1);
    x.set(0, x_image.0);
    x.set_sign(x_image.1);
    let mut z = PauliStringOwned::identity(1);
    z.set(0, z_image.0);
    z.set_sign(z_image.1);
    t.set_generator_images(0, x, z);
    t
}

fn two_qubit(x0: (&str, bool), z0: (&str, bool), x1: (&str, bool), z1: (&str, bool)) -> Tableau {
    let mut t = Tableau::identity(2);
    let parse = |pat: &str, sign: bool| -> PauliStringOwned {
        let mut p = PauliStringOwned::identity(2);
        for (k, c) in pat.chars().enumerate() {
            p.set(k, crate::pauli::pauli_code(c == 'X' || c == 'Y', c == 'Z' || c == 'Y'));
        }
        p.set_sign(sign);
        p
    };
    t.set_generator_images(0, parse(x0.0, x0.1), parse(z0.0, z0.1));
    t.set_generator_images(1, parse(x1.0, x1.1), parse(z1.0, z1.1));
    t
}

// Codes: I=0, X=1, Z=2, Y=3.
const X_CODE: u8 = 1;
const Z_CODE: u8 = 2;
const Y_CODE: u8 = 3;

fn build_registry() -> HashMap<&'static str, GateEntry> {
    let mut m = HashMap::new();
    let mut insert = |name: &'static str, inverse_name: &'static str, tableau: Tableau| {
        m.insert(name, GateEntry { canonical_name: name, inverse_name, tableau });
    };

    insert("I", "I", single_qubit((X_CODE, false), (Z_CODE, false)));
    insert("X", "X", single_qubit((X_CODE, false), (Z_CODE, true)));
    insert("Y", "Y", single_qubit((X_CODE, true), (Z_CODE, true)));
    insert("Z", "Z", single_qubit((X_CODE, true), (Z_CODE, false)));
    insert("H", "H", single_qubit((Z_CODE, false), (X_CODE, false)));
    insert("H_XY", "H_XY", single_qubit((Y_CODE, false), (Z_CODE, true)));
    insert("H_YZ", "H_YZ", single_qubit((X_CODE, true), (Y_CODE, false)));
    insert("S", "S_DAG", single_qubit((Y_CODE, false), (Z_CODE, false)));
    insert("S_DAG", "S", single_qubit((Y_CODE, true), (Z_CODE, false)));
    insert("SQRT_X", "SQRT_X_DAG", single_qubit((X_CODE, false), (Y_CODE, true)));
    insert("SQRT_X_DAG", "SQRT_X", single_qubit((X_CODE, false), (Y_CODE, false)));
    insert("SQRT_Y", "SQRT_Y_DAG", single_qubit((Z_CODE, true), (X_CODE, false)));
    insert("SQRT_Y_DAG", "SQRT_Y", single_qubit((Z_CODE, false), (X_CODE, true)));

    insert("CX", "CX", two_qubit(("XX", false), ("ZI", false), ("IX", false), ("ZZ", false)));
    insert("CY", "CY", two_qubit(("XY", false), ("ZI", false), ("ZX", false), ("ZZ", false)));
    insert("CZ", "CZ", two_qubit(("XZ", false), ("ZI", false), ("ZX", false), ("IZ", false)));
    insert("SWAP", "SWAP", two_qubit(("IX", false), ("IZ", false), ("XI", false), ("ZI", false)));

    insert(
        "ISWAP",
        "ISWAP_DAG",
        two_qubit(("ZY", false), ("IZ", false), ("YZ", false), ("ZI", false)),
    );
    insert(
        "ISWAP_DAG",
        "ISWAP",
        two_qubit(("ZY", true), ("IZ", false), ("YZ", true), ("ZI", false)),
    );
    insert("XCX", "XCX", two_qubit(("XI", false), ("ZX", false), ("IX", false), ("XZ", false)));
    insert("XCY", "XCY", two_qubit(("XI", false), ("ZY", false), ("XX", false), ("XZ", false)));
    insert("XCZ", "XCZ", two_qubit(("XI", false), ("ZZ", false), ("XX", false), ("IZ", false)));
    insert("YCX", "YCX", two_qubit(("XX", false), ("ZX", false), ("IX", false), ("YZ", false)));
    insert("YCY", "YCY", two_qubit(("XY", false), ("ZY", false), ("YX", false), ("YZ", false)));
    insert("YCZ", "YCZ", two_qubit(("XZ", false), ("ZZ", false), ("YX", false), ("IZ", false)));

    m
}

const ALIASES: &[(&str, &str)] = &[
    ("H_XZ", "H"),
    ("SQRT_Z", "S"),
    ("SQRT_Z_DAG", "S_DAG"),
    ("CNOT", "CX"),
];

fn canonicalize(name: &str) -> String {
    let upper = name.to_ascii_uppercase();
    for &(alias, canonical) in ALIASES {
        if alias == upper {
            return canonical.to_string();
        }
    }
    upper
}

static REGISTRY: OnceLock<HashMap<&'static str, GateEntry>> = OnceLock::new();

pub fn registry() -> &'static HashMap<&'static str, GateEntry> {
    REGISTRY.get_or_init(build_registry)
}

pub fn lookup(name: &str) -> Option<&'static GateEntry> {
    registry().get(canonicalize(name).as_str())
}
