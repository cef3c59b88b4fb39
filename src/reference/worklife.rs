//! Work-life expectancy: remaining years of labor force activity
//!
//! The built-in table approximates the Skoog, Ciecka & Krueger (2019)
//! Markov model values for initially-active persons, by sex and education,
//! at 5-year ages 25-65.

use std::collections::HashMap;

use super::interpolate;
use crate::person::{EducationLevel, Sex, MAX_AGE};

/// Years over which work-life tapers to zero beyond the last tabulated age
const TAPER_YEARS: u32 = 10;

/// Work-life expectancy keyed by (sex, education), each a column over age
#[derive(Debug, Clone)]
pub struct WorkLifeTable {
    columns: HashMap<(Sex, EducationLevel), Vec<(u32, f64)>>,
    label: String,
}

impl WorkLifeTable {
    /// Build from (sex, education, age, years) rows in any order
    pub fn from_rows(label: impl Into<String>, rows: &[(Sex, EducationLevel, u32, f64)]) -> Self {
        let mut columns: HashMap<(Sex, EducationLevel), Vec<(u32, f64)>> = HashMap::new();
        for &(sex, education, age, years) in rows {
            columns.entry((sex, education)).or_default().push((age, years));
        }
        for column in columns.values_mut() {
            column.sort_by_key(|(age, _)| *age);
            column.dedup_by_key(|(age, _)| *age);
        }

        Self { columns, label: label.into() }
    }

    /// Built-in fallback table
    pub fn skoog_2019_approx() -> Self {
        const AGES: [u32; 9] = [25, 30, 35, 40, 45, 50, 55, 60, 65];

        let male: [(EducationLevel, [f64; 9]); 7] = [
            (EducationLevel::LessThanHighSchool, [35.2, 30.5, 25.8, 21.2, 16.8, 12.8, 9.2, 6.1, 3.5]),
            (EducationLevel::HighSchool, [36.8, 32.1, 27.4, 22.8, 18.4, 14.2, 10.4, 7.1, 4.2]),
            (EducationLevel::SomeCollege, [37.5, 32.8, 28.1, 23.5, 19.1, 14.9, 11.0, 7.6, 4.5]),
            (EducationLevel::Bachelors, [38.2, 33.5, 28.8, 24.2, 19.8, 15.6, 11.6, 8.1, 4.8]),
            (EducationLevel::Masters, [38.8, 34.1, 29.4, 24.8, 20.4, 16.2, 12.1, 8.5, 5.1]),
            (EducationLevel::Doctoral, [39.2, 34.5, 29.8, 25.2, 20.8, 16.6, 12.4, 8.8, 5.3]),
            (EducationLevel::Professional, [39.0, 34.3, 29.6, 25.0, 20.6, 16.4, 12.3, 8.7, 5.2]),
        ];
        let female: [(EducationLevel, [f64; 9]); 7] = [
            (EducationLevel::LessThanHighSchool, [32.5, 28.2, 23.9, 19.8, 15.9, 12.3, 9.1, 6.3, 3.8]),
            (EducationLevel::HighSchool, [34.1, 29.8, 25.5, 21.4, 17.5, 13.7, 10.3, 7.3, 4.5]),
            (EducationLevel::SomeCollege, [34.8, 30.5, 26.2, 22.1, 18.2, 14.4, 10.9, 7.8, 4.8]),
            (EducationLevel::Bachelors, [35.5, 31.2, 26.9, 22.8, 18.9, 15.1, 11.5, 8.3, 5.1]),
            (EducationLevel::Masters, [36.1, 31.8, 27.5, 23.4, 19.5, 15.7, 12.0, 8.7, 5.4]),
            (EducationLevel::Doctoral, [36.5, 32.2, 27.9, 23.8, 19.9, 16.1, 12.3, 8.9, 5.6]),
            (EducationLevel::Professional, [36.3, 32.0, 27.7, 23.6, 19.7, 15.9, 12.2, 8.8, 5.5]),
        ];

        let mut rows = Vec::with_capacity(2 * 7 * AGES.len());
        for (sex, block) in [(Sex::Male, &male), (Sex::Female, &female)] {
            for (education, values) in block.iter() {
                for (age, years) in AGES.iter().zip(values.iter()) {
                    rows.push((sex, *education, *age, *years));
                }
            }
        }

        Self::from_rows("Skoog et al. (2019) work-life tables (built-in)", &rows)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Years within the tabulated range only
    pub fn years(&self, age: u32, sex: Sex, education: EducationLevel) -> Option<f64> {
        interpolate(self.columns.get(&(sex, education))?, age)
    }

    /// Years over the whole age range:
    /// - younger than the first row: first row's value
    /// - older than the last row: linear taper to zero over `TAPER_YEARS`
    /// - past `MAX_AGE`, or no column for (sex, education): None
    pub fn years_extended(&self, age: u32, sex: Sex, education: EducationLevel) -> Option<f64> {
        if age > MAX_AGE {
            return None;
        }
        let column = self.columns.get(&(sex, education))?;
        let &(first_age, first_value) = column.first()?;
        let &(last_age, last_value) = column.last()?;

        if age < first_age {
            Some(first_value)
        } else if age > last_age {
            let beyond = (age - last_age) as f64;
            Some((last_value * (1.0 - beyond / TAPER_YEARS as f64)).max(0.0))
        } else {
            interpolate(column, age)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_every_combination_present() {
        let table = WorkLifeTable::skoog_2019_approx();
        for sex in [Sex::Male, Sex::Female] {
            for education in EducationLevel::ALL {
                assert!(table.years(40, sex, education).is_some(), "{} {}", sex, education);
            }
        }
    }

    #[test]
    fn test_interpolation() {
        let table = WorkLifeTable::skoog_2019_approx();
        let years = table.years(44, Sex::Male, EducationLevel::Bachelors).unwrap();
        // 24.2 at 40, 19.8 at 45
        assert_relative_eq!(years, 24.2 - 4.4 * 0.8, epsilon = 1e-9);
    }

    #[test]
    fn test_extended_young_and_old() {
        let table = WorkLifeTable::skoog_2019_approx();
        let edu = EducationLevel::HighSchool;

        assert_eq!(table.years(20, Sex::Female, edu), None);
        assert_eq!(table.years_extended(20, Sex::Female, edu), Some(34.1));

        let at_70 = table.years_extended(70, Sex::Male, edu).unwrap();
        assert_relative_eq!(at_70, 4.2 * 0.5, epsilon = 1e-9);
        assert_eq!(table.years_extended(80, Sex::Male, edu), Some(0.0));
        assert_eq!(table.years_extended(MAX_AGE + 5, Sex::Male, edu), None);
    }

    #[test]
    fn test_more_education_more_years() {
        let table = WorkLifeTable::skoog_2019_approx();
        let hs = table.years(35, Sex::Male, EducationLevel::HighSchool).unwrap();
        let ba = table.years(35, Sex::Male, EducationLevel::Bachelors).unwrap();
        assert!(ba > hs);
    }
}
