use rand::seq::SliceRandom;
use rand::Rng;

/// Characters allowed in submission codes.
///
/// Omits the pairs 1/I and O/0 completely, since they are hard to tell apart even on screens, and
/// includes only one character of 2/Z, 4/A, 5/S and 6/G, which are easily confused in handwriting.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ3789";
pub const CODE_LENGTH: usize = 6;

/// Generate a random submission code
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| {
            *CODE_ALPHABET
                .choose(rng)
                .expect("Code alphabet should not be empty") as char
        })
        .collect()
}

/// Generate random submission codes until one is found that is not used yet.
///
/// `is_taken` is queried for every candidate code and may fail (e.g. with a database error), which
/// aborts the generation.
pub fn generate_unused_code<R, F, E>(rng: &mut R, mut is_taken: F) -> Result<String, E>
where
    R: Rng + ?Sized,
    F: FnMut(&str) -> Result<bool, E>,
{
    loop {
        let code = generate_code(rng);
        if !is_taken(&code)? {
            return Ok(code);
        }
    }
}

/// Check if the string is a well-formed submission code
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|c| CODE_ALPHABET.contains(&c))
}
