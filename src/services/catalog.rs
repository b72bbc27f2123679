// src/services/catalog.rs

/// WAEC/JAMB subjects offered for teaching.
pub const SUBJECTS: [&str; 15] = [
    "Mathematics",
    "English Language",
    "Physics",
    "Chemistry",
    "Biology",
    "Economics",
    "Geography",
    "Government",
    "Literature in English",
    "Commerce",
    "Accounting",
    "Agricultural Science",
    "Civic Education",
    "Computer Studies",
    "Further Mathematics",
];

pub fn is_known_subject(subject: &str) -> bool {
    SUBJECTS.contains(&subject)
}

/// Syllabus topics; empty for subjects not yet written up.
pub fn syllabus(subject: &str) -> &'static [&'static str] {
    match subject {
        "Mathematics" => &[
            "Number and Numeration",
            "Algebraic Processes",
            "Quadratic Equations",
            "Linear and Quadratic Graphs",
            "Trigonometry",
            "Geometry and Mensuration",
            "Statistics and Probability",
            "Calculus (Differentiation and Integration)",
        ],
        "Physics" => &[
            "Motion",
            "Force and Motion",
            "Energy and Power",
            "Electricity",
            "Magnetism",
            "Waves",
            "Light and Optics",
            "Modern Physics",
        ],
        "Chemistry" => &[
            "Atomic Structure",
            "Chemical Bonding",
            "Acids, Bases and Salts",
            "Oxidation and Reduction",
            "Organic Chemistry",
            "Periodic Table",
            "Chemical Reactions",
            "Stoichiometry",
        ],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_lookup_is_exact() {
        assert!(is_known_subject("Further Mathematics"));
        assert!(!is_known_subject("mathematics"));
    }

    #[test]
    fn unwritten_syllabus_is_empty() {
        assert_eq!(syllabus("Physics").len(), 8);
        assert!(syllabus("Commerce").is_empty());
    }
}
