//! Deterministic customer name generation from curated Kenyan name lists.
//!
//! Surnames follow the customer's home county where a county has a
//! dominant community; cosmopolitan counties draw from the whole list.

use crate::rng::SubsystemRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Community {
    Common,
    Kikuyu,
    Luo,
    Luhya,
    Kalenjin,
    Kamba,
    Muslim,
    Meru,
    Mijikenda,
    Somali,
}

pub struct NameGenerator;

impl NameGenerator {
    pub fn full_name(gender: char, county: &str, rng: &mut SubsystemRng) -> (String, String) {
        let first = Self::first_name(gender, county, rng);
        let last = Self::last_name(county, rng);
        (first.to_string(), last.to_string())
    }

    /// Coastal and north-eastern counties weight Muslim first names 3:1.
    pub fn first_name(gender: char, county: &str, rng: &mut SubsystemRng) -> &'static str {
        let names = if gender == 'M' { MALE_FIRST_NAMES } else { FEMALE_FIRST_NAMES };
        if COASTAL_AND_NORTH_EASTERN.contains(&county) {
            let weighted: Vec<(&'static str, f64)> = names
                .iter()
                .filter(|(_, c)| matches!(c, Community::Common | Community::Muslim))
                .map(|(n, c)| (*n, if *c == Community::Muslim { 3.0 } else { 1.0 }))
                .collect();
            if let Some(name) = rng.weighted(&weighted) {
                return *name;
            }
        }
        rng.pick(names).map(|(n, _)| *n).unwrap_or("John")
    }

    pub fn last_name(county: &str, rng: &mut SubsystemRng) -> &'static str {
        let community = match county {
            "Kiambu" | "Murang'a" | "Nyeri" | "Kirinyaga" => Some(Community::Kikuyu),
            "Siaya" | "Homa Bay" | "Migori" => Some(Community::Luo),
            "Kwale" | "Kilifi" | "Lamu" => Some(Community::Mijikenda),
            "Garissa" | "Wajir" | "Mandera" => Some(Community::Somali),
            "Kakamega" | "Vihiga" | "Bungoma" | "Busia" => Some(Community::Luhya),
            "Uasin Gishu" | "Nandi" | "Elgeyo-Marakwet" | "Trans-Nzoia" => Some(Community::Kalenjin),
            "Kitui" | "Machakos" | "Makueni" => Some(Community::Kamba),
            "Meru" | "Tharaka-Nithi" => Some(Community::Meru),
            _ => None,
        };
        let pool: Vec<&'static str> = match community {
            Some(c) => LAST_NAMES.iter().filter(|(_, o)| *o == c).map(|(n, _)| *n).collect(),
            None => LAST_NAMES.iter().map(|(n, _)| *n).collect(),
        };
        rng.pick(&pool).copied().unwrap_or("Mwangi")
    }
}

const COASTAL_AND_NORTH_EASTERN: [&str; 7] =
    ["Mombasa", "Kwale", "Kilifi", "Lamu", "Garissa", "Wajir", "Mandera"];

const MALE_FIRST_NAMES: &[(&str, Community)] = &[
    ("John", Community::Common),
    ("James", Community::Common),
    ("David", Community::Common),
    ("Joseph", Community::Common),
    ("Peter", Community::Common),
    ("Paul", Community::Common),
    ("Michael", Community::Common),
    ("Brian", Community::Common),
    ("Kevin", Community::Common),
    ("Dennis", Community::Common),
    ("Victor", Community::Common),
    ("Emmanuel", Community::Common),
    ("Wycliffe", Community::Common),
    ("Sospeter", Community::Common),
    ("Japheth", Community::Kikuyu),
    ("Ochieng", Community::Luo),
    ("Otieno", Community::Luo),
    ("Mwirigi", Community::Meru),
    ("Mohamed", Community::Muslim),
    ("Abdullahi", Community::Muslim),
    ("Omar", Community::Muslim),
    ("Hassan", Community::Muslim),
    ("Yusuf", Community::Muslim),
    ("Farah", Community::Somali),
    ("Aden", Community::Somali),
];

const FEMALE_FIRST_NAMES: &[(&str, Community)] = &[
    ("Mary", Community::Common),
    ("Elizabeth", Community::Common),
    ("Grace", Community::Common),
    ("Jane", Community::Common),
    ("Mercy", Community::Common),
    ("Esther", Community::Common),
    ("Faith", Community::Common),
    ("Winnie", Community::Common),
    ("Caroline", Community::Common),
    ("Maureen", Community::Common),
    ("Nasimiyu", Community::Luhya),
    ("Chebet", Community::Kalenjin),
    ("Mwikali", Community::Kamba),
    ("Kanana", Community::Meru),
    ("Amina", Community::Muslim),
    ("Fatuma", Community::Muslim),
    ("Khadija", Community::Muslim),
    ("Zainab", Community::Muslim),
    ("Halima", Community::Muslim),
    ("Habiba", Community::Somali),
    ("Sahra", Community::Somali),
];

const LAST_NAMES: &[(&str, Community)] = &[
    ("Mwangi", Community::Kikuyu),
    ("Kamau", Community::Kikuyu),
    ("Njoroge", Community::Kikuyu),
    ("Maina", Community::Kikuyu),
    ("Wanjiru", Community::Kikuyu),
    ("Ochieng", Community::Luo),
    ("Odhiambo", Community::Luo),
    ("Omondi", Community::Luo),
    ("Achieng", Community::Luo),
    ("Wafula", Community::Luhya),
    ("Wekesa", Community::Luhya),
    ("Nekesa", Community::Luhya),
    ("Korir", Community::Kalenjin),
    ("Kiprop", Community::Kalenjin),
    ("Jepchirchir", Community::Kalenjin),
    ("Mutua", Community::Kamba),
    ("Musyoka", Community::Kamba),
    ("Nduku", Community::Kamba),
    ("Kithinji", Community::Meru),
    ("Mugambi", Community::Meru),
    ("Karimi", Community::Meru),
    ("Katana", Community::Mijikenda),
    ("Karisa", Community::Mijikenda),
    ("Charo", Community::Mijikenda),
    ("Abdi", Community::Muslim),
    ("Hassan", Community::Muslim),
    ("Farah", Community::Somali),
    ("Warsame", Community::Somali),
    ("Ismail", Community::Somali),
];
