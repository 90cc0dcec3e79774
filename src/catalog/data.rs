//! The 24 faces on every board.

use super::EyeColor::{Blue, Brown as BrownEyes};
use super::HairColor::{Black, Blonde, Brown, Red, White};
use super::HairLength::{Long, Short};
use super::{Character, EyeColor, HairColor, HairLength};

#[allow(clippy::too_many_arguments)]
const fn face(
    id: u8,
    name: &'static str,
    hair_color: HairColor,
    eye_color: EyeColor,
    glasses: bool,
    hat: bool,
    facial_hair: bool,
    hair_length: HairLength,
    bald: bool,
    rosy_cheeks: bool,
    big_nose: bool,
) -> Character {
    Character {
        id,
        name,
        hair_color,
        eye_color,
        glasses,
        hat,
        facial_hair,
        hair_length,
        bald,
        rosy_cheeks,
        big_nose,
    }
}

#[rustfmt::skip]
pub(super) static CHARACTERS: [Character; 24] = [
    //    id  name       hair    eyes       glass  hat    facial length bald   rosy   nose
    face( 1, "Alex",    Brown,  Blue,      false, false, false, Short, false, true,  false),
    face( 2, "Bernard", Black,  BrownEyes, false, true,  true,  Short, false, false, true ),
    face( 3, "Claire",  Blonde, Blue,      false, false, false, Long,  false, false, false),
    face( 4, "David",   White,  BrownEyes, true,  false, true,  Short, false, false, false),
    face( 5, "Emma",    Red,    Blue,      false, true,  false, Long,  false, true,  false),
    face( 6, "Felix",   Brown,  BrownEyes, true,  false, true,  Short, false, false, true ),
    face( 7, "Grace",   Blonde, Blue,      false, false, false, Long,  false, true,  false),
    face( 8, "Henry",   Black,  BrownEyes, false, false, true,  Short, false, false, false),
    face( 9, "Iris",    Red,    BrownEyes, false, false, false, Long,  false, false, false),
    face(10, "Jake",    Brown,  Blue,      true,  true,  false, Short, false, false, false),
    face(11, "Kate",    Blonde, Blue,      false, true,  false, Long,  false, true,  false),
    face(12, "Leo",     Black,  BrownEyes, false, false, true,  Short, false, false, true ),
    face(13, "Maria",   Brown,  BrownEyes, false, false, false, Long,  false, false, false),
    face(14, "Nick",    White,  Blue,      true,  false, true,  Short, false, false, true ),
    face(15, "Olivia",  Blonde, BrownEyes, false, true,  false, Long,  false, true,  false),
    face(16, "Peter",   Red,    BrownEyes, true,  false, true,  Short, false, false, false),
    face(17, "Quinn",   Black,  Blue,      false, false, false, Short, false, false, false),
    face(18, "Rachel",  Brown,  Blue,      false, false, false, Long,  false, true,  true ),
    face(19, "Sam",     White,  BrownEyes, false, true,  true,  Short, true,  false, false),
    face(20, "Tara",    Blonde, Blue,      true,  false, false, Long,  false, false, false),
    face(21, "Uma",     Red,    BrownEyes, false, false, false, Long,  false, true,  false),
    face(22, "Victor",  Black,  BrownEyes, true,  true,  true,  Short, false, false, true ),
    face(23, "Wendy",   Brown,  Blue,      false, true,  false, Long,  false, false, false),
    face(24, "Zack",    White,  BrownEyes, false, false, true,  Short, true,  false, true ),
];
