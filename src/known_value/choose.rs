use super::Strategy;
use crate::settings::FuzzerSettings;

type Thunk<'a, T> = Box<dyn FnOnce(&mut FuzzerSettings) -> T + 'a>;

/// Weighted alternatives, of which exactly one is evaluated.
///
/// Each alternative is deferred behind a closure so that only the chosen one
/// draws random numbers or recurses.
pub struct Choices<'a, T> {
    entries: Vec<(Strategy, u32, Thunk<'a, T>)>,
}

impl<'a, T> Choices<'a, T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds an alternative. Zero-weight alternatives are dropped immediately.
    pub fn add(
        &mut self,
        strategy: Strategy,
        weight: u32,
        thunk: impl FnOnce(&mut FuzzerSettings) -> T + 'a,
    ) -> &mut Self {
        if weight > 0 {
            self.entries.push((strategy, weight, Box::new(thunk)));
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Picks an alternative with probability proportional to its weight and
    /// evaluates it.
    ///
    /// Returns `None` if there is nothing to choose from.
    pub fn choose(self, settings: &mut FuzzerSettings) -> Option<T> {
        let total: u64 = self
            .entries
            .iter()
            .map(|&(_, weight, _)| u64::from(weight))
            .sum();
        if total == 0 {
            return None;
        }
        let mut pick = settings.random_u64(total);
        for (strategy, weight, thunk) in self.entries {
            let weight = u64::from(weight);
            if pick < weight {
                log::trace!("Chose {strategy:?} (weight {weight} of {total})");
                return Some(thunk(settings));
            }
            pick -= weight;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn nothing_to_choose() {
        let mut settings = FuzzerSettings::from_seed(0);
        assert!(Choices::<()>::new().choose(&mut settings).is_none());

        let mut choices = Choices::new();
        choices.add(Strategy::Sum, 0, |_| ());
        assert!(choices.is_empty());
        assert!(choices.choose(&mut settings).is_none());
    }

    #[test]
    fn only_the_winner_runs() {
        let runs = Cell::new(0);
        let mut settings = FuzzerSettings::from_seed(1);
        for _ in 0..100 {
            let mut choices = Choices::new();
            choices
                .add(Strategy::Plain, 1, |_| {
                    runs.set(runs.get() + 1);
                    Strategy::Plain
                })
                .add(Strategy::Sum, 1, |_| {
                    runs.set(runs.get() + 1);
                    Strategy::Sum
                })
                .add(Strategy::Product, 0, |_| {
                    runs.set(runs.get() + 1);
                    Strategy::Product
                });
            assert_eq!(choices.len(), 2);
            let chosen = choices.choose(&mut settings).unwrap();
            assert_ne!(chosen, Strategy::Product);
        }
        assert_eq!(runs.get(), 100);
    }

    #[test]
    fn proportional_to_weight() {
        let mut settings = FuzzerSettings::from_seed(2);
        let mut heavy = 0;
        for _ in 0..4000 {
            let mut choices = Choices::new();
            choices.add(Strategy::Plain, 1, |_| false);
            choices.add(Strategy::Sum, 3, |_| true);
            if choices.choose(&mut settings).unwrap() {
                heavy += 1;
            }
        }
        assert!((2800..3200).contains(&heavy), "{heavy}");
    }

    #[test]
    fn chosen_thunk_gets_the_settings() {
        let mut settings = FuzzerSettings::from_seed(3);
        let mut choices = Choices::new();
        choices.add(Strategy::Sum, 5, |settings: &mut FuzzerSettings| {
            settings.random_int(10)
        });
        assert!(choices.choose(&mut settings).unwrap() < 10);
    }
}
