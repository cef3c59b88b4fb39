//! Period life table: remaining life expectancy by age and sex
//!
//! The built-in table is the abridged 2019 US total-population table
//! (5-year age groups 0-85). Ages between tabulated rows are interpolated
//! linearly.

use super::interpolate;
use crate::person::{Sex, MAX_AGE};

/// Remaining life expectancy by age, separately for each sex
#[derive(Debug, Clone)]
pub struct LifeTable {
    /// (age, remaining years), sorted by age
    female: Vec<(u32, f64)>,
    male: Vec<(u32, f64)>,

    label: String,
}

impl LifeTable {
    /// Build from (age, female, male) rows in any order
    pub fn from_rows(label: impl Into<String>, rows: &[(u32, f64, f64)]) -> Self {
        let mut sorted = rows.to_vec();
        sorted.sort_by_key(|(age, _, _)| *age);
        sorted.dedup_by_key(|(age, _, _)| *age);

        Self {
            female: sorted.iter().map(|&(age, f, _)| (age, f)).collect(),
            male: sorted.iter().map(|&(age, _, m)| (age, m)).collect(),
            label: label.into(),
        }
    }

    /// Built-in fallback: abridged US life table, 2019
    pub fn us_2019_abridged() -> Self {
        let rows = [
            // (age, female, male)
            (0, 81.4, 76.3),
            (5, 76.8, 71.8),
            (10, 71.9, 66.9),
            (15, 67.0, 62.0),
            (20, 62.1, 57.1),
            (25, 57.2, 52.3),
            (30, 52.3, 47.5),
            (35, 47.5, 42.7),
            (40, 42.7, 37.9),
            (45, 38.0, 33.2),
            (50, 33.4, 28.6),
            (55, 28.9, 24.2),
            (60, 24.5, 20.0),
            (65, 20.3, 16.1),
            (70, 16.3, 12.6),
            (75, 12.7, 9.6),
            (80, 9.6, 7.1),
            (85, 6.9, 5.1),
        ];
        Self::from_rows("US life table 2019 (built-in)", &rows)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn column(&self, sex: Sex) -> &[(u32, f64)] {
        match sex {
            Sex::Female => &self.female,
            Sex::Male => &self.male,
        }
    }

    /// Remaining years within the tabulated range only
    pub fn remaining_life(&self, age: u32, sex: Sex) -> Option<f64> {
        interpolate(self.column(sex), age)
    }

    /// Remaining years with the terminal row carried forward to `MAX_AGE`.
    /// None past `MAX_AGE` or for an empty table.
    pub fn remaining_life_extended(&self, age: u32, sex: Sex) -> Option<f64> {
        if age > MAX_AGE {
            return None;
        }
        let column = self.column(sex);
        let &(last_age, last_value) = column.last()?;
        if age > last_age {
            return Some(last_value);
        }
        let &(first_age, first_value) = column.first()?;
        if age < first_age {
            return Some(first_value);
        }
        interpolate(column, age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tabulated_ages() {
        let table = LifeTable::us_2019_abridged();
        assert_eq!(table.remaining_life(45, Sex::Male), Some(33.2));
        assert_eq!(table.remaining_life(45, Sex::Female), Some(38.0));
    }

    #[test]
    fn test_interpolated_age() {
        let table = LifeTable::us_2019_abridged();
        let le = table.remaining_life(44, Sex::Male).unwrap();
        assert_relative_eq!(le, 34.14, epsilon = 1e-9);
    }

    #[test]
    fn test_female_exceeds_male() {
        let table = LifeTable::us_2019_abridged();
        for age in (0..=85).step_by(5) {
            let f = table.remaining_life(age, Sex::Female).unwrap();
            let m = table.remaining_life(age, Sex::Male).unwrap();
            assert!(f > m, "age {}", age);
        }
    }

    #[test]
    fn test_extended_range() {
        let table = LifeTable::us_2019_abridged();
        assert_eq!(table.remaining_life(95, Sex::Male), None);
        assert_eq!(table.remaining_life_extended(95, Sex::Male), Some(5.1));
        assert_eq!(table.remaining_life_extended(MAX_AGE + 1, Sex::Male), None);
    }

    #[test]
    fn test_from_rows_sorts() {
        let table = LifeTable::from_rows("test", &[(50, 30.0, 28.0), (40, 40.0, 38.0)]);
        assert_relative_eq!(table.remaining_life(45, Sex::Male).unwrap(), 33.0);
    }
}
