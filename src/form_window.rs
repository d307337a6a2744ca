use std::collections::VecDeque;

/// Number of most recent matches that make up a team's form.
pub const FORM_WINDOW: usize = 5;

/// Fixed-capacity FIFO of raw per-match values; pushing past capacity evicts
/// the oldest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FormWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> FormWindow<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        self.items.push_back(value);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T> Default for FormWindow<T> {
    fn default() -> Self {
        Self::new(FORM_WINDOW)
    }
}

impl<T: Copy + Into<f64>> FormWindow<T> {
    pub fn sum(&self) -> f64 {
        self.items.iter().map(|v| (*v).into()).sum()
    }

    /// Average over the current window length, 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.sum() / self.items.len() as f64
    }
}

impl<T: PartialEq> FormWindow<T> {
    pub fn count(&self, value: &T) -> usize {
        self.items.iter().filter(|v| *v == value).count()
    }

    /// Fraction of the window equal to `value`, 0 when empty.
    pub fn share(&self, value: &T) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.count(value) as f64 / self.items.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut w: FormWindow<u32> = FormWindow::default();
        for v in 1..=7 {
            w.push(v);
        }
        assert_eq!(w.len(), 5);
        assert_eq!(w.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5, 6, 7]);
        assert!((w.mean() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn empty_window_yields_zero() {
        let w: FormWindow<u32> = FormWindow::default();
        assert_eq!(w.mean(), 0.0);
        assert_eq!(w.share(&1), 0.0);
    }

    #[test]
    fn share_uses_current_length() {
        let mut w = FormWindow::new(5);
        w.push('W');
        w.push('L');
        w.push('W');
        assert!((w.share(&'W') - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(w.count(&'D'), 0);
    }
}
