pub mod bitref;
pub mod table;
pub mod vec;
pub mod word;

pub use bitref::{BitRef, BitRefView};
pub use table::BitTable;
pub use vec::{BitVec, BitVecRef, BitVecRefMut, WORD_BITS};
pub use word::BitWord;
