//! Built-in fragment engine.
//!
//! Understands the organic subset of the line notation: bracket atoms,
//! branches, ring closures (including `%nn`), explicit bond symbols and
//! lowercase aromatic atoms. Stereo marks are accepted and ignored.
//!
//! Fingerprints are Morgan-style: every atom starts from a hashed invariant
//! and absorbs its neighbourhood once per radius step; every identifier seen
//! sets one bit. Similarity is Tanimoto over those bits.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt::Write;

use ferrocliff_common::{FingerprintConfig, Result};

use crate::engine::{ChemistryEngine, DepictOptions, Depiction, PatternMatch};

// ── Molecular graph ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    fn code(self) -> u64 {
        match self {
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Aromatic => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Element symbol, capitalised (`c` is stored as `C` + aromatic).
    pub element: String,
    pub aromatic: bool,
    pub charge: i8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
    pub order: BondOrder,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
    /// Per atom: (neighbour atom, bond index).
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Graph {
    fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    fn add_bond(&mut self, a: usize, b: usize, order: Option<BondOrder>) -> Option<usize> {
        if a == b || self.bond_between(a, b).is_some() {
            return None;
        }
        let order = order.unwrap_or(if self.atoms[a].aromatic && self.atoms[b].aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        });
        let idx = self.bonds.len();
        self.bonds.push(Bond { a, b, order });
        self.adjacency[a].push((b, idx));
        self.adjacency[b].push((a, idx));
        Some(idx)
    }

    pub fn neighbours(&self, atom: usize) -> &[(usize, usize)] {
        &self.adjacency[atom]
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<usize> {
        self.adjacency[a].iter().find(|(n, _)| *n == b).map(|(_, bond)| *bond)
    }
}

const ORGANIC: &[&str] = &["B", "C", "N", "O", "P", "S", "F", "I", "Cl", "Br"];
const AROMATIC: &[&str] = &["b", "c", "n", "o", "p", "s", "se", "as"];

/// Parse a line notation into a graph. `None` on any syntax error.
pub fn parse_notation(notation: &str) -> Option<Graph> {
    let chars: Vec<char> = notation.trim().chars().collect();
    let mut graph = Graph::default();
    let mut prev: Option<usize> = None;
    let mut branches: Vec<usize> = Vec::new();
    let mut pending: Option<BondOrder> = None;
    let mut rings: HashMap<u32, (usize, Option<BondOrder>)> = HashMap::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => branches.push(prev?),
            ')' => prev = Some(branches.pop()?),
            '-' | '/' | '\\' => pending = Some(BondOrder::Single),
            '=' => pending = Some(BondOrder::Double),
            '#' => pending = Some(BondOrder::Triple),
            ':' => pending = Some(BondOrder::Aromatic),
            '.' => {
                if pending.is_some() {
                    return None;
                }
                prev = None;
            }
            '0'..='9' | '%' => {
                let (number, width) = if c == '%' {
                    let digits: String = chars.get(i + 1..i + 3)?.iter().collect();
                    (digits.parse::<u32>().ok()?, 3)
                } else {
                    (c.to_digit(10)?, 1)
                };
                let here = prev?;
                match rings.remove(&number) {
                    Some((opener, opener_order)) => {
                        graph.add_bond(opener, here, pending.or(opener_order))?;
                    }
                    None => {
                        rings.insert(number, (here, pending));
                    }
                }
                pending = None;
                i += width;
                continue;
            }
            '[' => {
                let close = chars[i..].iter().position(|&ch| ch == ']')? + i;
                let body: String = chars[i + 1..close].iter().collect();
                let atom = parse_bracket_atom(&body)?;
                prev = Some(attach(&mut graph, atom, prev, pending.take())?);
                i = close + 1;
                continue;
            }
            _ => {
                let two: String = chars[i..chars.len().min(i + 2)].iter().collect();
                let symbol = if ORGANIC.contains(&two.as_str()) {
                    two
                } else {
                    c.to_string()
                };
                let atom = if ORGANIC.contains(&symbol.as_str()) {
                    Atom { element: symbol.clone(), aromatic: false, charge: 0 }
                } else if AROMATIC.contains(&symbol.as_str()) && symbol.len() == 1 {
                    Atom { element: symbol.to_uppercase(), aromatic: true, charge: 0 }
                } else {
                    return None;
                };
                prev = Some(attach(&mut graph, atom, prev, pending.take())?);
                i += symbol.len();
                continue;
            }
        }
        i += 1;
    }

    if graph.atoms.is_empty() || !branches.is_empty() || !rings.is_empty() || pending.is_some() {
        return None;
    }
    Some(graph)
}

fn attach(graph: &mut Graph, atom: Atom, prev: Option<usize>, order: Option<BondOrder>) -> Option<usize> {
    let idx = graph.add_atom(atom);
    match prev {
        Some(p) => {
            graph.add_bond(p, idx, order)?;
        }
        None if order.is_some() => return None,
        None => {}
    }
    Some(idx)
}

/// `[13CH3+]`, `[nH]`, `[Fe+2]`, `[C@@H]`, `[O-]`, `[NH4+:1]`
fn parse_bracket_atom(body: &str) -> Option<Atom> {
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }

    let first = *chars.get(i)?;
    let (element, aromatic) = if first.is_ascii_uppercase() {
        let mut symbol = first.to_string();
        if let Some(&next) = chars.get(i + 1) {
            if next.is_ascii_lowercase() {
                symbol.push(next);
            }
        }
        (symbol, false)
    } else {
        let two: String = chars[i..chars.len().min(i + 2)].iter().collect();
        let symbol = if AROMATIC.contains(&two.as_str()) { two } else { first.to_string() };
        if !AROMATIC.contains(&symbol.as_str()) {
            return None;
        }
        let mut cap = symbol.clone();
        cap[..1].make_ascii_uppercase();
        (cap, true)
    };
    i += element.len();

    while chars.get(i) == Some(&'@') {
        i += 1;
    }
    if chars.get(i) == Some(&'H') {
        i += 1;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
    }

    let mut charge: i8 = 0;
    if let Some(&sign) = chars.get(i).filter(|c| **c == '+' || **c == '-') {
        let unit: i8 = if sign == '+' { 1 } else { -1 };
        i += 1;
        let digits: String = chars[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            charge = unit;
            while chars.get(i) == Some(&sign) {
                charge = charge.checked_add(unit)?;
                i += 1;
            }
        } else {
            charge = unit.checked_mul(digits.parse::<i8>().ok()?)?;
            i += digits.len();
        }
    }

    if chars.get(i) == Some(&':') {
        i += 1;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
    }

    (i == chars.len()).then_some(Atom { element, aromatic, charge })
}

// ── Fingerprint ──────────────────────────────────────────────────────────────

/// FNV-1a 64-bit over a sequence of words.
fn fnv64(words: &[u64]) -> u64 {
    let mut hash: u64 = 14695981039346656037;
    for word in words {
        for byte in word.to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
    }
    hash
}

fn element_code(symbol: &str) -> u64 {
    symbol.bytes().fold(0u64, |acc, b| (acc << 8) | b as u64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    words: Vec<u64>,
    nbits: usize,
}

impl Fingerprint {
    fn new(nbits: usize) -> Self {
        Self { words: vec![0u64; nbits.div_ceil(64)], nbits }
    }

    fn set(&mut self, id: u64) {
        let pos = (id % self.nbits as u64) as usize;
        self.words[pos / 64] |= 1u64 << (pos % 64);
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    pub fn tanimoto(&self, other: &Fingerprint) -> f64 {
        let (mut both, mut either) = (0u32, 0u32);
        for (a, b) in self.words.iter().zip(&other.words) {
            both += (a & b).count_ones();
            either += (a | b).count_ones();
        }
        if either == 0 { 0.0 } else { both as f64 / either as f64 }
    }
}

pub fn morgan_fingerprint(graph: &Graph, radius: usize, nbits: usize) -> Fingerprint {
    let mut fp = Fingerprint::new(nbits);
    let mut ids: Vec<u64> = graph
        .atoms
        .iter()
        .enumerate()
        .map(|(i, atom)| {
            let valence: u64 = graph.neighbours(i).iter().map(|(_, b)| graph.bonds[*b].order.code()).sum();
            fnv64(&[
                element_code(&atom.element),
                atom.aromatic as u64,
                graph.neighbours(i).len() as u64,
                atom.charge as i64 as u64,
                valence,
            ])
        })
        .collect();
    ids.iter().for_each(|id| fp.set(*id));

    for _ in 0..radius {
        let next: Vec<u64> = (0..graph.atoms.len())
            .map(|i| {
                let mut env: Vec<(u64, u64)> = graph
                    .neighbours(i)
                    .iter()
                    .map(|(n, b)| (graph.bonds[*b].order.code(), ids[*n]))
                    .collect();
                env.sort_unstable();
                let mut words = vec![ids[i]];
                words.extend(env.into_iter().flat_map(|(o, id)| [o, id]));
                fnv64(&words)
            })
            .collect();
        next.iter().for_each(|id| fp.set(*id));
        ids = next;
    }
    fp
}

// ── Substructure matching ────────────────────────────────────────────────────

fn atoms_match(query: &Atom, target: &Atom) -> bool {
    query.element == target.element
        && query.aromatic == target.aromatic
        && (query.charge == 0 || query.charge == target.charge)
}

/// First embedding of `query` in `target` as (query atom → target atom).
pub fn find_embedding(target: &Graph, query: &Graph) -> Option<Vec<usize>> {
    if query.atoms.len() > target.atoms.len() {
        return None;
    }

    // Visit query atoms so each one after the first of its component has an
    // already-mapped neighbour; candidates then come from that neighbour.
    let mut order: Vec<usize> = Vec::with_capacity(query.atoms.len());
    let mut seen = vec![false; query.atoms.len()];
    for start in 0..query.atoms.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut queue = std::collections::VecDeque::from([start]);
        while let Some(q) = queue.pop_front() {
            order.push(q);
            for (n, _) in query.neighbours(q) {
                if !seen[*n] {
                    seen[*n] = true;
                    queue.push_back(*n);
                }
            }
        }
    }

    let mut mapping: Vec<Option<usize>> = vec![None; query.atoms.len()];
    let mut used = vec![false; target.atoms.len()];
    if extend(target, query, &order, 0, &mut mapping, &mut used) {
        mapping.into_iter().collect()
    } else {
        None
    }
}

fn extend(
    target: &Graph,
    query: &Graph,
    order: &[usize],
    depth: usize,
    mapping: &mut [Option<usize>],
    used: &mut [bool],
) -> bool {
    let Some(&q) = order.get(depth) else {
        return true;
    };

    let anchor = query.neighbours(q).iter().find_map(|(n, _)| mapping[*n]);
    let candidates: Vec<usize> = match anchor {
        Some(t) => target.neighbours(t).iter().map(|(n, _)| *n).collect(),
        None => (0..target.atoms.len()).collect(),
    };

    for t in candidates {
        if used[t] || !atoms_match(&query.atoms[q], &target.atoms[t]) {
            continue;
        }
        let bonds_ok = query.neighbours(q).iter().all(|(qn, qb)| match mapping[*qn] {
            Some(tn) => target
                .bond_between(t, tn)
                .is_some_and(|tb| target.bonds[tb].order == query.bonds[*qb].order),
            None => true,
        });
        if !bonds_ok {
            continue;
        }

        mapping[q] = Some(t);
        used[t] = true;
        if extend(target, query, order, depth + 1, mapping, used) {
            return true;
        }
        mapping[q] = None;
        used[t] = false;
    }
    false
}

// ── Depiction ─────────────────────────────────────────────────────────────────

const HIGHLIGHT: &str = "#ff6b6b";

fn render_svg(graph: &Graph, options: &DepictOptions) -> String {
    let (w, h) = (options.width as f64, options.height as f64);
    let n = graph.atoms.len();
    let radius = (w.min(h) / 2.0 - 10.0).max(1.0);
    let pos: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            if n == 1 {
                return (w / 2.0, h / 2.0);
            }
            let angle = 2.0 * PI * i as f64 / n as f64;
            (w / 2.0 + radius * angle.cos(), h / 2.0 + radius * angle.sin())
        })
        .collect();

    let (hl_atoms, hl_bonds): (&[usize], &[usize]) = match &options.highlight {
        Some(m) => (m.atoms.as_slice(), m.bonds.as_slice()),
        None => (&[], &[]),
    };

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">",
        options.width, options.height, options.width, options.height
    );
    for (idx, bond) in graph.bonds.iter().enumerate() {
        let ((x1, y1), (x2, y2)) = (pos[bond.a], pos[bond.b]);
        let colour = if hl_bonds.contains(&idx) { HIGHLIGHT } else { "#000000" };
        let width = match bond.order {
            BondOrder::Single => 1.0,
            BondOrder::Aromatic => 1.5,
            BondOrder::Double => 2.0,
            BondOrder::Triple => 3.0,
        };
        let _ = write!(
            svg,
            "<line x1=\"{x1:.1}\" y1=\"{y1:.1}\" x2=\"{x2:.1}\" y2=\"{y2:.1}\" stroke=\"{colour}\" stroke-width=\"{width}\"/>"
        );
    }
    for (idx, atom) in graph.atoms.iter().enumerate() {
        let (x, y) = pos[idx];
        if hl_atoms.contains(&idx) {
            let _ = write!(svg, "<circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"4\" fill=\"{HIGHLIGHT}\" fill-opacity=\"0.5\"/>");
        }
        if atom.element != "C" || atom.charge != 0 {
            let label = match atom.charge {
                0 => atom.element.clone(),
                1 => format!("{}+", atom.element),
                -1 => format!("{}-", atom.element),
                c => format!("{}{:+}", atom.element, c),
            };
            let _ = write!(
                svg,
                "<text x=\"{x:.1}\" y=\"{y:.1}\" font-size=\"8\" text-anchor=\"middle\">{label}</text>"
            );
        }
    }
    svg.push_str("</svg>");
    svg
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// A parsed structure with its fingerprint computed up front.
#[derive(Debug, Clone)]
pub struct FragmentMolecule {
    pub graph: Graph,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone)]
pub struct FragmentEngine {
    radius: usize,
    nbits: usize,
}

impl FragmentEngine {
    pub fn new(config: &FingerprintConfig) -> Self {
        Self { radius: config.radius, nbits: config.nbits.max(1) }
    }
}

impl Default for FragmentEngine {
    fn default() -> Self {
        Self::new(&FingerprintConfig::default())
    }
}

impl ChemistryEngine for FragmentEngine {
    type Molecule = FragmentMolecule;
    type Pattern = Graph;

    fn name(&self) -> &str {
        "fragment"
    }

    fn parse(&self, notation: &str) -> Option<FragmentMolecule> {
        let graph = parse_notation(notation)?;
        let fingerprint = morgan_fingerprint(&graph, self.radius, self.nbits);
        Some(FragmentMolecule { graph, fingerprint })
    }

    fn parse_pattern(&self, pattern: &str) -> Option<Graph> {
        parse_notation(pattern)
    }

    fn similarity(&self, a: &FragmentMolecule, b: &FragmentMolecule) -> Result<f64> {
        Ok(a.fingerprint.tanimoto(&b.fingerprint))
    }

    fn depict(&self, mol: &FragmentMolecule, options: &DepictOptions) -> Result<Depiction> {
        Ok(Depiction(render_svg(&mol.graph, options)))
    }

    fn match_pattern(&self, mol: &FragmentMolecule, pattern: &Graph) -> Result<Option<PatternMatch>> {
        let Some(mapping) = find_embedding(&mol.graph, pattern) else {
            return Ok(None);
        };
        let mut bonds: Vec<usize> = pattern
            .bonds
            .iter()
            .filter_map(|b| mol.graph.bond_between(mapping[b.a], mapping[b.b]))
            .collect();
        bonds.sort_unstable();
        let mut atoms = mapping;
        atoms.sort_unstable();
        Ok(Some(PatternMatch { atoms, bonds }))
    }
}
