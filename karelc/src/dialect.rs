//! Swappable SRC→TGT lexeme tables. Pure data: swapping the dialect
//! changes only the tokens a `DialectTable` hands back, never the
//! structure the rest of the compiler builds around them.

use std::collections::HashSet;

/// The fixed set of condition atoms recognized after `is_`/`not_`.
pub const CONDITION_ATOMS: [&str; 7] =
    ["wall", "flag", "home", "north", "south", "east", "west"];

/// The fixed set of primitive statement names the scanner recognizes
/// verbatim (in addition to `++`/`--`, which are sugar handled by the
/// instance compiler itself, not by this table).
pub const PRIMITIVE_NAMES: [&str; 5] = ["step", "left", "pick", "place", "stop"];

/// A dialect: one mapping from SRC keywords/primitives/conditions to
/// the TGT lexemes of a specific output dialect, plus the dialect's
/// own reserved-identifier set (names an SRC prototype may not use).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectTable {
    pub name: &'static str,
    primitives: [(&'static str, &'static str); 5],
    reserved: [&'static str; 3],
    end: &'static str,
    if_kw: &'static str,
    is_kw: &'static str,
    not_kw: &'static str,
    /// The TGT lexeme emitted for an `if` without a matching `else`,
    /// immediately before the closing `END`. The reference dialects
    /// spell this as a single two-word lexeme (`"END, ELSE"` /
    /// `"KONEC, JINAK"`) rather than a bare `ELSE` — carried through
    /// verbatim since it is what makes `IF … ELSE … END` collapse to
    /// just `IF … ELSE END` for an empty else branch without a
    /// second, separately-tracked token.
    else_kw: &'static str,
    while_kw: &'static str,
    for_kw: &'static str,
    for_suffix: &'static str,
    atoms: [(&'static str, &'static str); 7],
}

impl DialectTable {
    /// The original's `argparse` default: plain-ASCII English
    /// lexemes. This is the "Latin-identifier dialect" spec.md refers
    /// to in its `-lkarel-lang-dialect` flag description.
    pub fn pykarel_kvm() -> DialectTable {
        DialectTable {
            name: "PyKarel/Kvm",
            primitives: [
                ("step", "STEP"),
                ("left", "LEFT"),
                ("pick", "PICK"),
                ("place", "PLACE"),
                ("stop", "STOP"),
            ],
            reserved: ["end", "until", "repeat"],
            end: "END",
            if_kw: "IF",
            is_kw: "IS",
            not_kw: "ISNOT",
            else_kw: "END, ELSE",
            while_kw: "UNTIL",
            for_kw: "REPEAT",
            for_suffix: "-TIMES",
            atoms: [
                ("wall", "WALL"),
                ("flag", "FLAG"),
                ("home", "HOME"),
                ("north", "NORTH"),
                ("south", "SOUTH"),
                ("east", "EAST"),
                ("west", "WEST"),
            ],
        }
    }

    /// The original's Czech dialect, diacritics and all.
    pub fn visk99() -> DialectTable {
        DialectTable {
            name: "VisK99",
            primitives: [
                ("step", "KROK"),
                ("left", "VLEVO-VBOK"),
                ("pick", "ZVEDNI"),
                ("place", "POLOŽ"),
                ("stop", "STOP"),
            ],
            reserved: ["konec", "dokud", "opakuj"],
            end: "KONEC",
            if_kw: "KDYŽ",
            is_kw: "JE",
            not_kw: "NENÍ",
            else_kw: "KONEC, JINAK",
            while_kw: "DOKUD",
            for_kw: "OPAKUJ",
            for_suffix: "-KRÁT",
            atoms: [
                ("wall", "ZEĎ"),
                ("flag", "ZNAČKA"),
                ("home", "DOMOV"),
                ("north", "SEVER"),
                ("south", "JIH"),
                ("east", "VÝCHOD"),
                ("west", "ZÁPAD"),
            ],
        }
    }

    /// Select a dialect by the name `-lkarel-lang-dialect` takes.
    pub fn by_name(name: &str) -> Option<DialectTable> {
        match name {
            "PyKarel/Kvm" => Some(DialectTable::pykarel_kvm()),
            "VisK99" => Some(DialectTable::visk99()),
            _ => None,
        }
    }

    pub fn primitive(&self, name: &str) -> Option<&'static str> {
        self.primitives.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        let upper = name.to_uppercase();
        self.reserved.contains(&name)
            || self.primitives.iter().any(|(_, v)| *v == upper)
            || [
                self.end, self.if_kw, self.is_kw, self.not_kw, self.while_kw, self.for_kw,
            ]
            .contains(&upper.as_str())
    }

    pub fn end(&self) -> &'static str {
        self.end
    }

    pub fn if_kw(&self) -> &'static str {
        self.if_kw
    }

    pub fn else_kw(&self) -> &'static str {
        self.else_kw
    }

    pub fn while_kw(&self) -> &'static str {
        self.while_kw
    }

    pub fn for_kw(&self) -> &'static str {
        self.for_kw
    }

    pub fn for_suffix(&self) -> &'static str {
        self.for_suffix
    }

    /// Translate a condition atom plus its `is_`/`not_` prefix into
    /// the dialect's `IS <ATOM>` / `ISNOT <ATOM>` text.
    pub fn condition(&self, negate: bool, atom: &str) -> Option<String> {
        let prefix = if negate { self.not_kw } else { self.is_kw };
        self.atoms
            .iter()
            .find(|(k, _)| *k == atom)
            .map(|(_, v)| format!("{} {}", prefix, v))
    }

    pub fn atom_names(&self) -> HashSet<&'static str> {
        self.atoms.iter().map(|(k, _)| *k).collect()
    }
}

impl Default for DialectTable {
    fn default() -> Self {
        DialectTable::pykarel_kvm()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pykarel_is_the_default() {
        assert_eq!(DialectTable::default().name, "PyKarel/Kvm");
    }

    #[test]
    fn condition_translation() {
        let d = DialectTable::pykarel_kvm();
        assert_eq!(d.condition(false, "wall").unwrap(), "IS WALL");
        assert_eq!(d.condition(true, "wall").unwrap(), "ISNOT WALL");
    }

    #[test]
    fn visk99_condition_translation() {
        let d = DialectTable::visk99();
        assert_eq!(d.condition(false, "wall").unwrap(), "JE ZEĎ");
        assert_eq!(d.condition(true, "wall").unwrap(), "NENÍ ZEĎ");
    }

    #[test]
    fn by_name_rejects_unknown() {
        assert!(DialectTable::by_name("Esperanto").is_none());
    }
}
