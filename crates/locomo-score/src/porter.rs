//! Classic Porter stemmer (M.F. Porter, 1980), following the reference C
//! implementation including its two departures (`bli -> ble`, `logi -> log`)
//! and leaving words of one or two letters alone.
//!
//! Input is expected to be lowercase. Words containing anything other than
//! ASCII letters and digits are returned unchanged, since the suffix rules
//! are only defined over `a-z`.

/// Stem a single lowercase word.
///
/// Words with non-ASCII letters (`cafés`, `naïvely`) come back whole: the
/// measure counts vowels across the entire word, so stemming only an ASCII
/// tail would apply rules to the wrong measure.
pub fn stem(word: &str) -> String {
    // Non-ASCII words are left intact.
    if word.len() <= 2 || !word.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return word.to_string();
    }

    let mut s = Stemmer::new(word);
    s.step1ab();
    if s.k > 1 {
        s.step1c();
        s.step2();
        s.step3();
        s.step4();
        s.step5();
    }
    // Only ASCII bytes were ever written.
    String::from_utf8_lossy(&s.b[..s.k]).into_owned()
}

/// `b[..k]` is the current word, `b[..j]` the stem left by the last `ends` match.
/// Bytes past `k` are stale but still readable, as step 5 relies on.
struct Stemmer {
    b: Vec<u8>,
    k: usize,
    j: usize,
}

impl Stemmer {
    fn new(word: &str) -> Self {
        let b = word.as_bytes().to_vec();
        let k = b.len();
        Self { b, k, j: k }
    }

    fn cons(&self, i: usize) -> bool {
        match self.b[i] {
            b'a' | b'e' | b'i' | b'o' | b'u' => false,
            b'y' => i == 0 || !self.cons(i - 1),
            _ => true,
        }
    }

    /// Number of VC sequences in `b[..j]`.
    fn m(&self) -> usize {
        let mut n = 0;
        let mut i = 0;
        loop {
            if i >= self.j {
                return n;
            }
            if !self.cons(i) {
                break;
            }
            i += 1;
        }
        i += 1;
        loop {
            loop {
                if i >= self.j {
                    return n;
                }
                if self.cons(i) {
                    break;
                }
                i += 1;
            }
            i += 1;
            n += 1;
            loop {
                if i >= self.j {
                    return n;
                }
                if !self.cons(i) {
                    break;
                }
                i += 1;
            }
            i += 1;
        }
    }

    fn vowel_in_stem(&self) -> bool {
        (0..self.j).any(|i| !self.cons(i))
    }

    /// `b[..end]` ends with a double consonant.
    fn double_c(&self, end: usize) -> bool {
        end >= 2 && self.b[end - 1] == self.b[end - 2] && self.cons(end - 1)
    }

    /// consonant-vowel-consonant ending at index `i`, last one not w, x or y.
    fn cvc(&self, i: usize) -> bool {
        if i < 2 || !self.cons(i) || self.cons(i - 1) || !self.cons(i - 2) {
            return false;
        }
        !matches!(self.b[i], b'w' | b'x' | b'y')
    }

    fn ends(&mut self, suffix: &str) -> bool {
        let s = suffix.as_bytes();
        if s.len() > self.k || &self.b[self.k - s.len()..self.k] != s {
            return false;
        }
        self.j = self.k - s.len();
        true
    }

    fn set_to(&mut self, s: &str) {
        self.b.truncate(self.j);
        self.b.extend_from_slice(s.as_bytes());
        self.k = self.j + s.len();
    }

    fn replace_if_measured(&mut self, s: &str) {
        if self.m() > 0 {
            self.set_to(s);
        }
    }

    fn last(&self) -> u8 {
        self.b[self.k - 1]
    }

    fn penultimate(&self) -> Option<u8> {
        (self.k >= 2).then(|| self.b[self.k - 2])
    }

    /// Plurals and -ed / -ing.
    fn step1ab(&mut self) {
        if self.last() == b's' {
            if self.ends("sses") {
                self.k -= 2;
            } else if self.ends("ies") {
                self.set_to("i");
            } else if self.penultimate() != Some(b's') {
                self.k -= 1;
            }
        }
        if self.ends("eed") {
            if self.m() > 0 {
                self.k -= 1;
            }
        } else if (self.ends("ed") || self.ends("ing")) && self.vowel_in_stem() {
            self.k = self.j;
            if self.ends("at") {
                self.set_to("ate");
            } else if self.ends("bl") {
                self.set_to("ble");
            } else if self.ends("iz") {
                self.set_to("ize");
            } else if self.double_c(self.k) {
                self.k -= 1;
                if matches!(self.last(), b'l' | b's' | b'z') {
                    self.k += 1;
                }
            } else {
                self.j = self.k;
                if self.m() == 1 && self.cvc(self.k - 1) {
                    self.set_to("e");
                }
            }
        }
    }

    /// Terminal y to i when there is another vowel in the stem.
    fn step1c(&mut self) {
        if self.ends("y") && self.vowel_in_stem() {
            let k = self.k;
            self.b[k - 1] = b'i';
        }
    }

    /// Map double suffixes to single ones.
    fn step2(&mut self) {
        let rules: &[(&str, &str)] = match self.penultimate() {
            Some(b'a') => &[("ational", "ate"), ("tional", "tion")],
            Some(b'c') => &[("enci", "ence"), ("anci", "ance")],
            Some(b'e') => &[("izer", "ize")],
            Some(b'l') => &[
                ("bli", "ble"),
                ("alli", "al"),
                ("entli", "ent"),
                ("eli", "e"),
                ("ousli", "ous"),
            ],
            Some(b'o') => &[("ization", "ize"), ("ation", "ate"), ("ator", "ate")],
            Some(b's') => &[
                ("alism", "al"),
                ("iveness", "ive"),
                ("fulness", "ful"),
                ("ousness", "ous"),
            ],
            Some(b't') => &[("aliti", "al"), ("iviti", "ive"), ("biliti", "ble")],
            Some(b'g') => &[("logi", "log")],
            _ => &[],
        };
        self.apply_first(rules);
    }

    /// -ic-, -full, -ness etc.
    fn step3(&mut self) {
        let rules: &[(&str, &str)] = match self.last() {
            b'e' => &[("icate", "ic"), ("ative", ""), ("alize", "al")],
            b'i' => &[("iciti", "ic")],
            b'l' => &[("ical", "ic"), ("ful", "")],
            b's' => &[("ness", "")],
            _ => &[],
        };
        self.apply_first(rules);
    }

    /// The first matching suffix decides, whether or not the measure allows
    /// the replacement.
    fn apply_first(&mut self, rules: &[(&str, &str)]) {
        for (suffix, replacement) in rules {
            if self.ends(suffix) {
                self.replace_if_measured(replacement);
                return;
            }
        }
    }

    /// Strip -ant, -ence etc. in context <c>vcvc<v>.
    fn step4(&mut self) {
        let matched = match self.penultimate() {
            Some(b'a') => self.ends("al"),
            Some(b'c') => self.ends("ance") || self.ends("ence"),
            Some(b'e') => self.ends("er"),
            Some(b'i') => self.ends("ic"),
            Some(b'l') => self.ends("able") || self.ends("ible"),
            Some(b'n') => {
                self.ends("ant") || self.ends("ement") || self.ends("ment") || self.ends("ent")
            }
            Some(b'o') => {
                (self.ends("ion") && self.j >= 1 && matches!(self.b[self.j - 1], b's' | b't'))
                    || self.ends("ou")
            }
            Some(b's') => self.ends("ism"),
            Some(b't') => self.ends("ate") || self.ends("iti"),
            Some(b'u') => self.ends("ous"),
            Some(b'v') => self.ends("ive"),
            Some(b'z') => self.ends("ize"),
            _ => false,
        };
        if matched && self.m() > 1 {
            self.k = self.j;
        }
    }

    /// Remove a final -e and reduce -ll when the measure allows.
    fn step5(&mut self) {
        self.j = self.k;
        if self.last() == b'e' {
            let a = self.m();
            if a > 1 || (a == 1 && !self.cvc(self.k - 2)) {
                self.k -= 1;
            }
        }
        if self.last() == b'l' && self.double_c(self.k) && self.m() > 1 {
            self.k -= 1;
        }
    }
}
