//! Graph sources.
//!
//! A [`GraphSource`] delivers random graphs of a requested class as 0-based
//! edge lists. The remote service speaks Wolfram Language list syntax, e.g.
//!
//! ```text
//! {UndirectedEdge[1, 2], UndirectedEdge[2, 3]}
//! {UndirectedEdge[1, 3], UndirectedEdge[2, 3]}
//! ```
//!
//! which [`parse_edge_lists`] reads with a small bracket/number parser.

use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use super::error::SourceError;
use super::settings::GraphSpec;

/// `(source, target)` pairs with 0-based node indices.
pub type EdgeList = Vec<(usize, usize)>;

/// Supplier of random graphs.
#[async_trait(?Send)]
pub trait GraphSource {
	/// Fetch `count` graphs of class `spec`, generated from `seed`.
	async fn fetch_graphs(
		&self,
		spec: GraphSpec,
		count: usize,
		seed: u64,
	) -> Result<Vec<EdgeList>, SourceError>;
}

/// Index origin of node numbers in service text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBase {
	/// Nodes are numbered from 0.
	Zero,
	/// Nodes are numbered from 1.
	One,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
	Number { value: u64, offset: usize },
	List { items: Vec<Value>, offset: usize },
}

impl Value {
	fn offset(&self) -> usize {
		match self {
			Value::Number { offset, .. } | Value::List { offset, .. } => *offset,
		}
	}

	fn first_item(&self) -> Option<&Value> {
		match self {
			Value::List { items, .. } => items.first(),
			Value::Number { .. } => None,
		}
	}
}

const EDGE_HEADS: &[&str] = &["UndirectedEdge", "DirectedEdge", "TwoWayRule", "Rule"];

/// Deepest list nesting accepted. Real service text nests three levels.
const MAX_DEPTH: usize = 32;

struct Parser<'a> {
	text: &'a str,
	pos: usize,
	depth: usize,
}

impl<'a> Parser<'a> {
	fn new(text: &'a str) -> Self {
		Self {
			text,
			pos: 0,
			depth: 0,
		}
	}

	fn error(&self, message: impl Into<String>) -> SourceError {
		SourceError::Parse {
			offset: self.pos,
			message: message.into(),
		}
	}

	fn rest(&self) -> &'a str {
		&self.text[self.pos..]
	}

	fn peek(&mut self) -> Option<char> {
		let trimmed = self.rest().trim_start();
		self.pos = self.text.len() - trimmed.len();
		trimmed.chars().next()
	}

	fn eat(&mut self, token: &str) -> bool {
		if self.peek().is_some() && self.rest().starts_with(token) {
			self.pos += token.len();
			true
		} else {
			false
		}
	}

	fn document(&mut self) -> Result<Vec<Value>, SourceError> {
		let mut values = Vec::new();
		while self.peek().is_some() {
			values.push(self.element()?);
			self.eat(",");
		}
		Ok(values)
	}

	/// An atom, optionally joined to a second one by `<->` or `->`.
	fn element(&mut self) -> Result<Value, SourceError> {
		let first = self.atom()?;
		if self.eat("<->") || self.eat("->") {
			let second = self.atom()?;
			let offset = first.offset();
			return Ok(Value::List {
				items: vec![first, second],
				offset,
			});
		}
		Ok(first)
	}

	fn atom(&mut self) -> Result<Value, SourceError> {
		match self.peek() {
			Some('{') => self.list('{', '}'),
			Some('[') => self.list('[', ']'),
			Some(c) if c.is_ascii_digit() => self.number(),
			Some(c) if c.is_ascii_alphabetic() => self.headed(),
			Some(c) => Err(self.error(format!("unexpected `{c}`"))),
			None => Err(self.error("unexpected end of input")),
		}
	}

	fn number(&mut self) -> Result<Value, SourceError> {
		let offset = self.pos;
		let digits = self.rest().bytes().take_while(u8::is_ascii_digit).count();
		let value = self.rest()[..digits]
			.parse()
			.map_err(|_| self.error("number out of range"))?;
		self.pos += digits;
		Ok(Value::Number { value, offset })
	}

	/// `Head[args]`, keeping only the arguments.
	fn headed(&mut self) -> Result<Value, SourceError> {
		let len = self
			.rest()
			.bytes()
			.take_while(u8::is_ascii_alphanumeric)
			.count();
		let head = &self.rest()[..len];
		if !EDGE_HEADS.contains(&head) {
			return Err(self.error(format!("unsupported head `{head}`")));
		}
		self.pos += len;
		if self.peek() != Some('[') {
			return Err(self.error(format!("expected `[` after `{head}`")));
		}
		self.list('[', ']')
	}

	fn list(&mut self, open: char, close: char) -> Result<Value, SourceError> {
		if self.depth == MAX_DEPTH {
			return Err(self.error("nesting too deep"));
		}
		self.depth += 1;
		let list = self.list_items(open, close);
		self.depth -= 1;
		list
	}

	fn list_items(&mut self, open: char, close: char) -> Result<Value, SourceError> {
		let offset = self.pos;
		self.pos += open.len_utf8();
		let mut items = Vec::new();
		loop {
			if self.peek() == Some(close) {
				self.pos += close.len_utf8();
				return Ok(Value::List { items, offset });
			}
			items.push(self.element()?);
			if self.eat(",") {
				continue;
			}
			if self.peek() != Some(close) {
				return Err(self.error(format!("expected `,` or `{close}`")));
			}
		}
	}
}

fn to_edge(value: &Value, base: IndexBase) -> Result<(usize, usize), SourceError> {
	let malformed = |offset| SourceError::Parse {
		offset,
		message: "edge must be a pair of node numbers".to_owned(),
	};
	let Value::List { items, offset } = value else {
		return Err(malformed(value.offset()));
	};
	let [Value::Number { value: a, offset: a_off }, Value::Number { value: b, offset: b_off }] =
		items.as_slice()
	else {
		return Err(malformed(*offset));
	};
	let index = |n: u64, offset: usize| {
		let n = match base {
			IndexBase::Zero => Some(n),
			IndexBase::One => n.checked_sub(1),
		};
		n.and_then(|n| usize::try_from(n).ok())
			.ok_or_else(|| SourceError::Parse {
				offset,
				message: "node number out of range".to_owned(),
			})
	};
	Ok((index(*a, *a_off)?, index(*b, *b_off)?))
}

fn to_edge_list(value: &Value, base: IndexBase) -> Result<EdgeList, SourceError> {
	match value {
		Value::List { items, .. } => items.iter().map(|e| to_edge(e, base)).collect(),
		Value::Number { offset, .. } => Err(SourceError::Parse {
			offset: *offset,
			message: "graph must be a list of edges".to_owned(),
		}),
	}
}

/// Parse service text into 0-based edge lists, one per graph.
///
/// Graphs may be given one per line, separated by commas, or wrapped in
/// a single outer list. Edges may be written as `{a, b}`, `Head[a, b]` or
/// `a <-> b`.
pub fn parse_edge_lists(text: &str, base: IndexBase) -> Result<Vec<EdgeList>, SourceError> {
	let values = Parser::new(text).document()?;
	// An edge holds two numbers, so an empty inner list can only be a graph.
	let wrapped = match values.as_slice() {
		[Value::List { items, .. }] => {
			!items.is_empty()
				&& items.iter().all(|g| {
					matches!(g, Value::List { .. })
						&& matches!(g.first_item(), None | Some(Value::List { .. }))
				})
		}
		_ => false,
	};
	let graphs = match (wrapped, values.as_slice()) {
		(true, [Value::List { items, .. }]) => items.as_slice(),
		_ => values.as_slice(),
	};
	graphs.iter().map(|g| to_edge_list(g, base)).collect()
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
	#[serde(rename = "Result")]
	result: String,
}

/// Graph service reached over HTTP.
///
/// Sends `n`, `m`, `k` and `s` (vertices, edges, count, seed) as query
/// parameters and expects a JSON object whose `Result` field holds the
/// 1-based edge lists.
#[derive(Debug, Clone)]
pub struct HttpGraphSource {
	client: reqwest::Client,
	url: String,
}

impl HttpGraphSource {
	/// Create a source for the service at `url`.
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			client: reqwest::Client::new(),
			url: url.into(),
		}
	}
}

#[async_trait(?Send)]
impl GraphSource for HttpGraphSource {
	async fn fetch_graphs(
		&self,
		spec: GraphSpec,
		count: usize,
		seed: u64,
	) -> Result<Vec<EdgeList>, SourceError> {
		debug!("requesting {count} x {spec} from {} (seed {seed})", self.url);
		let response = self
			.client
			.get(&self.url)
			.query(&[
				("n", spec.vertex_count as u64),
				("m", spec.edge_count as u64),
				("k", count as u64),
				("s", seed),
			])
			.send()
			.await?
			.error_for_status()?;
		let body: ServiceResponse = response.json().await?;
		parse_edge_lists(&body.result, IndexBase::One)
	}
}

/// Fixed graphs per graph class, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticGraphSource {
	graphs: HashMap<GraphSpec, Vec<EdgeList>>,
}

impl StaticGraphSource {
	/// Create an empty source.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register the graphs served for `spec`.
	pub fn with_graphs(mut self, spec: GraphSpec, graphs: Vec<EdgeList>) -> Self {
		self.graphs.insert(spec, graphs);
		self
	}
}

#[async_trait(?Send)]
impl GraphSource for StaticGraphSource {
	async fn fetch_graphs(
		&self,
		spec: GraphSpec,
		count: usize,
		_seed: u64,
	) -> Result<Vec<EdgeList>, SourceError> {
		let graphs = self
			.graphs
			.get(&spec)
			.ok_or_else(|| SourceError::Service(format!("no graphs registered for {spec}")))?;
		Ok(graphs.iter().take(count).cloned().collect())
	}
}

/// Uniform random graphs with exactly `m` distinct edges on `n` vertices.
///
/// Deterministic for a given seed. Loops and parallel edges never occur.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGraphSource;

impl RandomGraphSource {
	fn generate(rng: &mut ChaCha8Rng, spec: GraphSpec, possible: usize) -> EdgeList {
		let mut edges: EdgeList = rand::seq::index::sample(rng, possible, spec.edge_count)
			.into_iter()
			.map(|k| pair_at(spec.vertex_count, k))
			.collect();
		edges.sort_unstable();
		edges
	}
}

/// The `k`-th pair `(i, j)` with `i < j < n`, in row-major order.
fn pair_at(n: usize, mut k: usize) -> (usize, usize) {
	let mut i = 0;
	while k >= n - i - 1 {
		k -= n - i - 1;
		i += 1;
	}
	(i, i + 1 + k)
}

#[async_trait(?Send)]
impl GraphSource for RandomGraphSource {
	async fn fetch_graphs(
		&self,
		spec: GraphSpec,
		count: usize,
		seed: u64,
	) -> Result<Vec<EdgeList>, SourceError> {
		let n = spec.vertex_count;
		let possible = n.saturating_mul(n.saturating_sub(1)) / 2;
		if spec.edge_count > possible {
			return Err(SourceError::InvalidSpec(format!(
				"{spec} needs more edges than the {possible} a simple graph can have"
			)));
		}
		let mut rng = ChaCha8Rng::seed_from_u64(seed);
		Ok((0..count)
			.map(|_| Self::generate(&mut rng, spec, possible))
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::executor::block_on;
	use pretty_assertions::assert_eq;
	use std::collections::HashSet;

	#[test]
	fn parses_one_graph_per_line() {
		let text = "{UndirectedEdge[1, 2], UndirectedEdge[2, 3]}\n{UndirectedEdge[1, 3]}\n";
		let graphs = parse_edge_lists(text, IndexBase::One).unwrap();
		assert_eq!(graphs, vec![vec![(0, 1), (1, 2)], vec![(0, 2)]]);
	}

	#[test]
	fn parses_wrapped_and_infix_forms() {
		let text = "{{1 <-> 2, 2 <-> 4}, {{3, 1}}}";
		let graphs = parse_edge_lists(text, IndexBase::One).unwrap();
		assert_eq!(graphs, vec![vec![(0, 1), (1, 3)], vec![(2, 0)]]);
	}

	#[test]
	fn parses_zero_based_brackets() {
		let graphs = parse_edge_lists("[[0, 1], [1, 2]], [[2, 0]]", IndexBase::Zero).unwrap();
		assert_eq!(graphs, vec![vec![(0, 1), (1, 2)], vec![(2, 0)]]);
	}

	#[test]
	fn empty_graph_and_empty_text() {
		assert_eq!(parse_edge_lists("{}", IndexBase::One).unwrap(), vec![vec![]]);
		assert!(parse_edge_lists("  \n", IndexBase::One).unwrap().is_empty());
	}

	#[test]
	fn rejects_code_and_malformed_input() {
		for text in [
			"alert(1)",
			"{UndirectedEdge[1, 2]",
			"{{1, 2, 3}}",
			"{{1, -2}}",
			"{{1; 2}}",
			"{[1, 2}}",
			"{{1 <-> }}",
		] {
			assert!(
				matches!(
					parse_edge_lists(text, IndexBase::One),
					Err(SourceError::Parse { .. })
				),
				"{text:?}"
			);
		}
	}

	#[test]
	fn wrapped_empty_graphs() {
		assert_eq!(
			parse_edge_lists("{{}, {}}", IndexBase::One).unwrap(),
			vec![vec![], vec![]]
		);
		assert_eq!(
			parse_edge_lists("{{}, {{1, 2}}}", IndexBase::One).unwrap(),
			vec![vec![], vec![(0, 1)]]
		);
	}

	#[test]
	fn deep_nesting_is_rejected_without_recursing() {
		let err = parse_edge_lists(&"{".repeat(200_000), IndexBase::One).unwrap_err();
		match err {
			SourceError::Parse { offset, message } => {
				assert_eq!(offset, MAX_DEPTH);
				assert_eq!(message, "nesting too deep");
			}
			other => panic!("unexpected error {other:?}"),
		}

		let at_limit = format!("{}{}", "{".repeat(MAX_DEPTH), "}".repeat(MAX_DEPTH));
		assert!(!matches!(
			parse_edge_lists(&at_limit, IndexBase::One),
			Err(SourceError::Parse { ref message, .. }) if message == "nesting too deep"
		));
	}

	#[test]
	fn node_zero_is_invalid_when_one_based() {
		let err = parse_edge_lists("{{0, 1}}", IndexBase::One).unwrap_err();
		assert!(matches!(err, SourceError::Parse { offset: 2, .. }), "{err:?}");
	}

	#[test]
	fn pair_enumeration_covers_all_pairs_once() {
		let n = 6;
		let pairs: HashSet<_> = (0..n * (n - 1) / 2).map(|k| pair_at(n, k)).collect();
		assert_eq!(pairs.len(), 15);
		assert!(pairs.iter().all(|&(i, j)| i < j && j < n));
	}

	#[test]
	fn random_graphs_match_their_class() {
		let spec = GraphSpec::new(12, 20);
		let graphs = block_on(RandomGraphSource.fetch_graphs(spec, 3, 42)).unwrap();
		assert_eq!(graphs.len(), 3);
		for edges in &graphs {
			let distinct: HashSet<_> = edges.iter().collect();
			assert_eq!(distinct.len(), 20);
			assert!(edges.iter().all(|&(a, b)| a < b && b < 12));
		}
		assert_ne!(graphs[0], graphs[1]);
	}

	#[test]
	fn random_graphs_are_seeded() {
		let spec = GraphSpec::new(30, 40);
		let a = block_on(RandomGraphSource.fetch_graphs(spec, 2, 7)).unwrap();
		let b = block_on(RandomGraphSource.fetch_graphs(spec, 2, 7)).unwrap();
		let c = block_on(RandomGraphSource.fetch_graphs(spec, 2, 8)).unwrap();
		assert_eq!(a, b);
		assert_ne!(a, c);
	}

	#[test]
	fn impossible_class_is_rejected() {
		let err = block_on(RandomGraphSource.fetch_graphs(GraphSpec::new(4, 7), 1, 0)).unwrap_err();
		assert!(matches!(err, SourceError::InvalidSpec(_)));
	}

	#[test]
	fn static_source_serves_registered_graphs() {
		let spec = GraphSpec::new(3, 2);
		let source = StaticGraphSource::new()
			.with_graphs(spec, vec![vec![(0, 1), (1, 2)], vec![(0, 2), (2, 1)]]);
		let graphs = block_on(source.fetch_graphs(spec, 1, 0)).unwrap();
		assert_eq!(graphs, vec![vec![(0, 1), (1, 2)]]);
		assert!(block_on(source.fetch_graphs(GraphSpec::new(9, 9), 1, 0)).is_err());
	}
}
