/// A trait for values that are guaranteed present by construction.
pub trait Assume {
    /// The type of the assumed value.
    type Assumed;

    /// Assume `Self` holds a value of `Self::Assumed`.
    ///
    /// Panics if the assumption is violated; that is a programming bug, not a
    /// recoverable condition.
    fn assume(self) -> Self::Assumed;
}

impl<T> Assume for Option<T> {
    type Assumed = T;

    #[track_caller]
    #[inline(always)]
    fn assume(self) -> Self::Assumed {
        match self {
            Some(t) => t,
            None => unreachable!("assumed value was absent"),
        }
    }
}

impl<T, E> Assume for Result<T, E> {
    type Assumed = T;

    #[track_caller]
    #[inline(always)]
    fn assume(self) -> Self::Assumed {
        match self {
            Ok(t) => t,
            Err(_) => unreachable!("assumed result was an error"),
        }
    }
}
