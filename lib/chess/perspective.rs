/// Trait for types that can be horizontally mirrored.
pub trait Mirror {
    /// This value's horizontal mirror image.
    fn mirror(self) -> Self;
}

/// Trait for types that can be vertically flipped.
pub trait Flip {
    /// This value's vertical flip.
    fn flip(self) -> Self;
}

/// Trait for types that can be reflected across the a1-h8 diagonal.
pub trait Transpose {
    type Transposition;

    /// This value's transposition.
    fn transpose(self) -> Self::Transposition;
}
