//! Cartesian products of ordered sequences.
//!
//! Products are produced in first-argument-major order: the last sequence
//! varies fastest. If any input is empty the product is empty.

/// Lazy cartesian product over a set of borrowed slices.
///
/// Each item holds one reference per input slice, in input order.
#[derive(Debug, Clone)]
pub struct CartesianProduct<'a, T> {
	inputs: Vec<&'a [T]>,
	cursor: Vec<usize>,
	remaining: usize,
}

impl<'a, T> CartesianProduct<'a, T> {
	/// Create a product over `inputs`. The same slice may appear more than once.
	///
	/// A product with more than `usize::MAX` items stops after `usize::MAX`.
	pub fn new(inputs: &[&'a [T]]) -> Self {
		let remaining = if inputs.is_empty() || inputs.iter().any(|s| s.is_empty()) {
			0
		} else {
			inputs
				.iter()
				.try_fold(1usize, |acc, s| acc.checked_mul(s.len()))
				.unwrap_or(usize::MAX)
		};
		Self {
			inputs: inputs.to_vec(),
			cursor: vec![0; inputs.len()],
			remaining,
		}
	}

	fn advance(&mut self) {
		for axis in (0..self.cursor.len()).rev() {
			self.cursor[axis] += 1;
			if self.cursor[axis] < self.inputs[axis].len() {
				return;
			}
			self.cursor[axis] = 0;
		}
	}
}

impl<'a, T> Iterator for CartesianProduct<'a, T> {
	type Item = Vec<&'a T>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.remaining == 0 {
			return None;
		}
		let item = self
			.cursor
			.iter()
			.zip(&self.inputs)
			.map(|(&i, input)| &input[i])
			.collect();
		self.remaining -= 1;
		self.advance();
		Some(item)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining, Some(self.remaining))
	}
}

impl<T> ExactSizeIterator for CartesianProduct<'_, T> {}

/// Eager cartesian product with owned elements.
///
/// ```
/// use force_layout_research::research::combinations;
///
/// let product = combinations(&[&[1, 2][..], &[3, 4][..]]);
/// assert_eq!(product, vec![vec![1, 3], vec![1, 4], vec![2, 3], vec![2, 4]]);
/// ```
pub fn combinations<T: Clone>(inputs: &[&[T]]) -> Vec<Vec<T>> {
	CartesianProduct::new(inputs)
		.map(|item| item.into_iter().cloned().collect())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn first_argument_varies_slowest() {
		let product = combinations(&[&["1", "2"][..], &["a", "b"][..]]);
		assert_eq!(
			product,
			vec![
				vec!["1", "a"],
				vec!["1", "b"],
				vec!["2", "a"],
				vec!["2", "b"]
			]
		);
	}

	#[test]
	fn three_inputs() {
		let product = combinations(&[&[1][..], &[2, 3][..], &[4][..]]);
		assert_eq!(product, vec![vec![1, 2, 4], vec![1, 3, 4]]);
	}

	#[test]
	fn size_is_product_of_lengths() {
		let a = [1, 2, 3];
		let b = [10, 20, 30, 40, 50];
		let product = CartesianProduct::new(&[&a[..], &b[..]]);
		assert_eq!(product.len(), 15);
		assert_eq!(product.count(), 15);
	}

	#[test]
	fn any_empty_input_gives_empty_product() {
		let empty: [u8; 0] = [];
		assert!(combinations(&[&empty[..], &[1, 2][..]]).is_empty());
		assert!(combinations(&[&[1, 2][..], &empty[..]]).is_empty());
		assert!(combinations(&[&[1][..], &empty[..], &[3][..]]).is_empty());
		assert!(combinations::<u8>(&[]).is_empty());
	}

	#[test]
	fn self_product_keeps_symmetric_and_self_pairs() {
		let edges = ['x', 'y'];
		let pairs = combinations(&[&edges[..], &edges[..]]);
		assert_eq!(
			pairs,
			vec![
				vec!['x', 'x'],
				vec!['x', 'y'],
				vec!['y', 'x'],
				vec!['y', 'y']
			]
		);
	}

	#[test]
	fn oversized_product_saturates() {
		let units = vec![(); 1 << 20];
		let mut product = CartesianProduct::new(&[&units[..]; 4]);
		assert_eq!(product.len(), usize::MAX);
		assert_eq!(product.next().map(|item| item.len()), Some(4));
		assert_eq!(product.len(), usize::MAX - 1);

		let empty: [(); 0] = [];
		let with_empty = [&units[..], &units[..], &units[..], &units[..], &empty[..]];
		assert_eq!(CartesianProduct::new(&with_empty).len(), 0);
	}

	#[test]
	fn single_input_yields_singletons() {
		assert_eq!(combinations(&[&[7, 8][..]]), vec![vec![7], vec![8]]);
	}
}
