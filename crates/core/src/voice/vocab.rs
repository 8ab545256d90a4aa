//! Spoken vocabulary for chess moves
//!
//! Every table maps the words a speech-to-text engine actually produces to
//! the chess symbol they stand for, including its usual mishearings ("for"
//! for 4, "ate" for 8, "see" for c, "night" for knight). Recognition gets
//! better by adding entries here; the parser itself never changes.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use shakmaty::{File, Rank, Role, Square};

static STANDARD: LazyLock<Vocabulary> = LazyLock::new(Vocabulary::standard);

/// Word sets that carry no value of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Capture,
    Castle,
    Queenside,
    Kingside,
    Promote,
    Exit,
    Resign,
    Draw,
    Accept,
    Decline,
}

const FILES: &[(File, &[&str])] = &[
    (File::A, &["a", "alpha", "ay", "hey"]),
    (File::B, &["b", "bravo", "bee", "be"]),
    (File::C, &["c", "charlie", "see", "sea"]),
    (File::D, &["d", "delta", "dee"]),
    (File::E, &["e", "echo", "ee"]),
    (File::F, &["f", "foxtrot", "ef", "eff"]),
    (File::G, &["g", "golf", "gee"]),
    (File::H, &["h", "hotel", "aitch"]),
];

const RANKS: &[(Rank, &[&str])] = &[
    (Rank::First, &["1", "one", "won"]),
    (Rank::Second, &["2", "two", "to", "too"]),
    (Rank::Third, &["3", "three", "tree", "free"]),
    (Rank::Fourth, &["4", "four", "for", "fore"]),
    (Rank::Fifth, &["5", "five"]),
    (Rank::Sixth, &["6", "six"]),
    (Rank::Seventh, &["7", "seven"]),
    (Rank::Eighth, &["8", "eight", "ate"]),
];

const PIECES: &[(Role, &[&str])] = &[
    (Role::King, &["king"]),
    (Role::Queen, &["queen"]),
    (Role::Rook, &["rook", "rock"]),
    (Role::Bishop, &["bishop"]),
    (Role::Knight, &["knight", "night", "nite"]),
    (Role::Pawn, &["pawn", "pon"]),
];

const KEYWORDS: &[(Keyword, &[&str])] = &[
    (Keyword::Capture, &["takes", "take", "captures", "capture", "x", "ex"]),
    (Keyword::Castle, &["castle", "castles", "castling", "oo", "ooo", "00", "000"]),
    (Keyword::Queenside, &["queen", "queens", "queenside", "long", "ooo", "000"]),
    (Keyword::Kingside, &["kingside", "short", "oo"]),
    (Keyword::Promote, &["promote", "promotes", "promoting", "promotion", "equals"]),
    (Keyword::Exit, &["exit", "quit", "stop"]),
    (Keyword::Resign, &["resign", "resigns", "forfeit"]),
    (Keyword::Draw, &["draw"]),
    (Keyword::Accept, &["accept", "accepts", "yes"]),
    (Keyword::Decline, &["decline", "declines", "reject", "refuse", "no"]),
];

#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    files: HashMap<String, File>,
    ranks: HashMap<String, Rank>,
    pieces: HashMap<String, Role>,
    keywords: HashMap<Keyword, HashSet<String>>,
}

impl Vocabulary {
    /// The process-wide standard tables, built on first use.
    pub fn shared() -> &'static Vocabulary {
        &STANDARD
    }

    pub fn standard() -> Self {
        let mut vocab = Self::default();
        for (file, words) in FILES {
            for word in *words {
                vocab.add_file(word, *file);
            }
        }
        for (rank, words) in RANKS {
            for word in *words {
                vocab.add_rank(word, *rank);
            }
        }
        for (role, words) in PIECES {
            for word in *words {
                vocab.add_piece(word, *role);
            }
        }
        for (keyword, words) in KEYWORDS {
            for word in *words {
                vocab.add_keyword(*keyword, word);
            }
        }
        vocab
    }

    pub fn add_file(&mut self, word: &str, file: File) {
        self.files.insert(word.to_lowercase(), file);
    }

    pub fn add_rank(&mut self, word: &str, rank: Rank) {
        self.ranks.insert(word.to_lowercase(), rank);
    }

    pub fn add_piece(&mut self, word: &str, role: Role) {
        self.pieces.insert(word.to_lowercase(), role);
    }

    pub fn add_keyword(&mut self, keyword: Keyword, word: &str) {
        self.keywords
            .entry(keyword)
            .or_default()
            .insert(word.to_lowercase());
    }

    pub fn file(&self, word: &str) -> Option<File> {
        self.files.get(word).copied()
    }

    pub fn rank(&self, word: &str) -> Option<Rank> {
        self.ranks.get(word).copied()
    }

    pub fn piece(&self, word: &str) -> Option<Role> {
        self.pieces.get(word).copied()
    }

    pub fn is_pawn(&self, word: &str) -> bool {
        self.piece(word) == Some(Role::Pawn)
    }

    /// Pieces a pawn may promote to.
    pub fn promotion(&self, word: &str) -> Option<Role> {
        self.piece(word)
            .filter(|role| !matches!(role, Role::Pawn | Role::King))
    }

    pub fn is(&self, keyword: Keyword, word: &str) -> bool {
        self.keywords
            .get(&keyword)
            .is_some_and(|words| words.contains(word))
    }

    /// A square spoken as one two-character word, like "g5".
    pub fn square(&self, word: &str) -> Option<Square> {
        let mut chars = word.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(f), Some(r), None) => self.square_of(f, r),
            _ => None,
        }
    }

    /// Two squares run together into one word, like "e2e4".
    pub fn square_pair(&self, word: &str) -> Option<(Square, Square)> {
        let chars: Vec<char> = word.chars().collect();
        match chars.as_slice() {
            [f1, r1, f2, r2] => Some((self.square_of(*f1, *r1)?, self.square_of(*f2, *r2)?)),
            _ => None,
        }
    }

    fn square_of(&self, file: char, rank: char) -> Option<Square> {
        let file = self.file(file.encode_utf8(&mut [0; 4]))?;
        let rank = self.rank(rank.encode_utf8(&mut [0; 4]))?;
        Some(Square::from_coords(file, rank))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homophones() {
        let vocab = Vocabulary::shared();
        assert_eq!(vocab.rank("for"), Some(Rank::Fourth));
        assert_eq!(vocab.rank("ate"), Some(Rank::Eighth));
        assert_eq!(vocab.rank("won"), Some(Rank::First));
        assert_eq!(vocab.rank("to"), Some(Rank::Second));
        assert_eq!(vocab.file("see"), Some(File::C));
        assert_eq!(vocab.piece("night"), Some(Role::Knight));
    }

    #[test]
    fn test_unknown_words() {
        let vocab = Vocabulary::shared();
        assert_eq!(vocab.file("i"), None);
        assert_eq!(vocab.rank("nine"), None);
        assert_eq!(vocab.piece("horse"), None);
        assert!(!vocab.is(Keyword::Capture, "eats"));
    }

    #[test]
    fn test_promotion_excludes_king_and_pawn() {
        let vocab = Vocabulary::shared();
        assert_eq!(vocab.promotion("queen"), Some(Role::Queen));
        assert_eq!(vocab.promotion("night"), Some(Role::Knight));
        assert_eq!(vocab.promotion("king"), None);
        assert_eq!(vocab.promotion("pawn"), None);
    }

    #[test]
    fn test_combined_squares() {
        let vocab = Vocabulary::shared();
        assert_eq!(vocab.square("g5"), Some(Square::G5));
        assert_eq!(vocab.square("i5"), None);
        assert_eq!(vocab.square("g9"), None);
        assert_eq!(vocab.square("g"), None);
        assert_eq!(vocab.square_pair("e2e4"), Some((Square::E2, Square::E4)));
        assert_eq!(vocab.square_pair("e2e9"), None);
    }

    #[test]
    fn test_extending_vocabulary() {
        let mut vocab = Vocabulary::standard();
        assert_eq!(vocab.rank("sicks"), None);
        vocab.add_rank("Sicks", Rank::Sixth);
        vocab.add_keyword(Keyword::Capture, "grabs");
        assert_eq!(vocab.rank("sicks"), Some(Rank::Sixth));
        assert!(vocab.is(Keyword::Capture, "grabs"));
    }
}
