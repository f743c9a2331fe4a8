//! Resource chamber model.
//!
//! A chamber is a square grid of cells. The central sub-region (the
//! nursery, rows and columns in `[n/4, n - n/4)`) holds pending offspring;
//! every other cell holds stored output. The chamber itself is not
//! synchronized: its owning colony guards it with the chamber lock.
//!
//! ```text
//!  n = 8
//!  . . . . . . . .
//!  . . . . . . . .
//!  . . o o o o . .     o = nursery (offspring)
//!  . . o o o o . .     . = storage (output)
//!  . . o o o o . .
//!  . . o o o o . .
//!  . . . . . . . .
//!  . . . . . . . .
//! ```

use rand::Rng;
use std::time::Instant;

/// Grid coordinate (row, column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellPos {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

impl CellPos {
    /// Creates a position.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// One chamber cell.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    /// Stored output units.
    pub output: u64,
    /// Pending offspring units.
    pub offspring: u32,
    /// When the oldest pending offspring in this cell was laid.
    pub laid_at: Option<Instant>,
    /// When the oldest pending offspring in this cell may hatch.
    pub hatch_due: Option<Instant>,
}

impl Cell {
    /// Whether the cell holds nothing.
    pub fn is_empty(&self) -> bool {
        self.output == 0 && self.offspring == 0
    }
}

/// Square cell grid partitioned into nursery and storage zones.
#[derive(Debug, Clone)]
pub struct ResourceChamber {
    size: usize,
    cells: Vec<Cell>,
}

impl ResourceChamber {
    /// Creates an empty `size × size` chamber.
    ///
    /// `size` must be at least 4 so both zones are non-empty.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size * size],
        }
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether a position lies in the central offspring zone.
    pub fn in_nursery(&self, pos: CellPos) -> bool {
        let lo = self.size / 4;
        let hi = self.size - lo;
        (lo..hi).contains(&pos.row) && (lo..hi).contains(&pos.col)
    }

    /// Cell at a position.
    pub fn cell(&self, pos: CellPos) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    /// Fixed storage cell used when probing finds no empty cell.
    pub fn overflow_cell(&self) -> CellPos {
        CellPos::new(0, 0)
    }

    /// Fixed nursery cell used when probing finds no empty cell.
    fn nursery_fallback(&self) -> CellPos {
        let lo = self.size / 4;
        CellPos::new(lo, lo)
    }

    /// Stores output in a storage cell and returns where it went.
    ///
    /// Probes up to `attempts` random storage cells for an empty one and
    /// falls back to the overflow cell.
    pub fn store_output<R: Rng>(&mut self, amount: u64, attempts: u32, rng: &mut R) -> CellPos {
        let pos = self
            .probe(attempts, rng, |chamber, pos| !chamber.in_nursery(pos))
            .unwrap_or_else(|| self.overflow_cell());
        let i = self.index_unchecked(pos);
        self.cells[i].output = self.cells[i].output.saturating_add(amount);
        pos
    }

    /// Lays one offspring in a nursery cell and returns where it went.
    pub fn lay_offspring<R: Rng>(
        &mut self,
        laid_at: Instant,
        hatch_due: Instant,
        attempts: u32,
        rng: &mut R,
    ) -> CellPos {
        let pos = self
            .probe(attempts, rng, |chamber, pos| chamber.in_nursery(pos))
            .unwrap_or_else(|| self.nursery_fallback());
        let i = self.index_unchecked(pos);
        let cell = &mut self.cells[i];
        cell.offspring += 1;
        cell.laid_at.get_or_insert(laid_at);
        cell.hatch_due = Some(match cell.hatch_due {
            Some(due) => due.min(hatch_due),
            None => hatch_due,
        });
        pos
    }

    /// Removes one offspring from a nursery cell.
    ///
    /// Returns `false` if the cell holds none.
    pub fn take_offspring(&mut self, pos: CellPos) -> bool {
        let Some(i) = self.index(pos) else {
            return false;
        };
        let cell = &mut self.cells[i];
        if cell.offspring == 0 {
            return false;
        }
        cell.offspring -= 1;
        if cell.offspring == 0 {
            cell.laid_at = None;
            cell.hatch_due = None;
        }
        true
    }

    /// Nursery cells holding offspring whose hatch time has passed.
    pub fn due_offspring(&self, now: Instant) -> Vec<CellPos> {
        self.positions()
            .filter(|&pos| {
                let cell = &self.cells[self.index_unchecked(pos)];
                cell.offspring > 0 && cell.hatch_due.is_some_and(|due| due <= now)
            })
            .collect()
    }

    /// First nursery cell holding any offspring.
    pub fn any_offspring(&self) -> Option<CellPos> {
        self.positions()
            .find(|&pos| self.cells[self.index_unchecked(pos)].offspring > 0)
    }

    /// Sum of stored output over all cells.
    pub fn total_output(&self) -> u64 {
        self.cells.iter().map(|c| c.output).sum()
    }

    /// Sum of pending offspring over all cells.
    pub fn total_offspring(&self) -> u64 {
        self.cells.iter().map(|c| u64::from(c.offspring)).sum()
    }

    /// Whether the zone invariant holds: offspring only in the nursery,
    /// output only in storage.
    pub fn zones_respected(&self) -> bool {
        self.positions().all(|pos| {
            let cell = &self.cells[self.index_unchecked(pos)];
            if self.in_nursery(pos) {
                cell.output == 0
            } else {
                cell.offspring == 0
            }
        })
    }

    fn probe<R, F>(&self, attempts: u32, rng: &mut R, zone: F) -> Option<CellPos>
    where
        R: Rng,
        F: Fn(&Self, CellPos) -> bool,
    {
        for _ in 0..attempts {
            let pos = CellPos::new(rng.random_range(0..self.size), rng.random_range(0..self.size));
            if zone(self, pos) && self.cells[self.index_unchecked(pos)].is_empty() {
                return Some(pos);
            }
        }
        None
    }

    fn positions(&self) -> impl Iterator<Item = CellPos> + '_ {
        (0..self.size).flat_map(move |row| (0..self.size).map(move |col| CellPos::new(row, col)))
    }

    fn index(&self, pos: CellPos) -> Option<usize> {
        (pos.row < self.size && pos.col < self.size).then(|| self.index_unchecked(pos))
    }

    fn index_unchecked(&self, pos: CellPos) -> usize {
        pos.row * self.size + pos.col
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::time::Duration;

    #[test]
    fn test_nursery_bounds() {
        let chamber = ResourceChamber::new(8);
        assert!(chamber.in_nursery(CellPos::new(2, 2)));
        assert!(chamber.in_nursery(CellPos::new(5, 5)));
        assert!(!chamber.in_nursery(CellPos::new(1, 4)));
        assert!(!chamber.in_nursery(CellPos::new(6, 3)));
        assert!(!chamber.in_nursery(chamber.overflow_cell()));
    }

    #[test]
    fn test_store_output_stays_in_storage() {
        let mut chamber = ResourceChamber::new(10);
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..500 {
            let pos = chamber.store_output(3, 8, &mut rng);
            assert!(!chamber.in_nursery(pos));
        }
        assert_eq!(chamber.total_output(), 1500);
        assert!(chamber.zones_respected());
    }

    #[test]
    fn test_zero_attempts_uses_overflow() {
        let mut chamber = ResourceChamber::new(10);
        let mut rng = SmallRng::seed_from_u64(1);
        let pos = chamber.store_output(5, 0, &mut rng);
        assert_eq!(pos, chamber.overflow_cell());
        assert_eq!(chamber.cell(pos).unwrap().output, 5);
    }

    #[test]
    fn test_lay_and_hatch_cycle() {
        let mut chamber = ResourceChamber::new(8);
        let mut rng = SmallRng::seed_from_u64(7);
        let now = Instant::now();
        let due = now + Duration::from_millis(50);

        let pos = chamber.lay_offspring(now, due, 8, &mut rng);
        assert!(chamber.in_nursery(pos));
        assert_eq!(chamber.total_offspring(), 1);
        assert_eq!(chamber.cell(pos).unwrap().laid_at, Some(now));

        // Not yet due
        assert!(chamber.due_offspring(now).is_empty());
        assert_eq!(chamber.due_offspring(due), vec![pos]);

        assert!(chamber.take_offspring(pos));
        assert!(!chamber.take_offspring(pos));
        assert_eq!(chamber.total_offspring(), 0);
        assert!(chamber.cell(pos).unwrap().hatch_due.is_none());
        assert!(chamber.zones_respected());
    }

    #[test]
    fn test_any_offspring() {
        let mut chamber = ResourceChamber::new(8);
        let mut rng = SmallRng::seed_from_u64(3);
        assert!(chamber.any_offspring().is_none());
        let now = Instant::now();
        let pos = chamber.lay_offspring(now, now, 0, &mut rng);
        assert_eq!(chamber.any_offspring(), Some(pos));
    }

    #[test]
    fn test_out_of_range() {
        let mut chamber = ResourceChamber::new(4);
        assert!(chamber.cell(CellPos::new(4, 0)).is_none());
        assert!(!chamber.take_offspring(CellPos::new(9, 9)));
    }
}
