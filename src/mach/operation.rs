use super::{val::string_to_num, Array, Val};
use crate::error;
use crate::lang::Error;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// ## Operator semantics
///
/// Integer math wraps. `+ - & |` double as set operations on two arrays.

pub struct Operation {}

impl Operation {
    pub fn add(lhs: Val, rhs: Val) -> Result<Val> {
        Operation::math_or_set(lhs, rhs, i32::wrapping_add, Array::union)
    }

    pub fn subtract(lhs: Val, rhs: Val) -> Result<Val> {
        Operation::math_or_set(lhs, rhs, i32::wrapping_sub, Array::difference)
    }

    pub fn bit_and(lhs: Val, rhs: Val) -> Result<Val> {
        Operation::math_or_set(lhs, rhs, |l, r| l & r, Array::intersection)
    }

    pub fn bit_or(lhs: Val, rhs: Val) -> Result<Val> {
        Operation::math_or_set(lhs, rhs, |l, r| l | r, Array::symmetric_difference)
    }

    fn math_or_set(
        lhs: Val,
        rhs: Val,
        math: fn(i32, i32) -> i32,
        set: fn(&Array, &Array) -> Array,
    ) -> Result<Val> {
        match (&lhs, &rhs) {
            (Val::Array(l), Val::Array(r)) => Ok(Val::from(set(&l.borrow(), &r.borrow()))),
            (Val::Array(_), _) | (_, Val::Array(_)) => {
                Err(error!(TypeMismatch; "can't mix math with arrays and non-arrays"))
            }
            _ => Ok(Val::Integer(math(lhs.to_int()?, rhs.to_int()?))),
        }
    }

    pub fn multiply(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::Integer(lhs.to_int()?.wrapping_mul(rhs.to_int()?)))
    }

    pub fn divide(lhs: Val, rhs: Val) -> Result<Val> {
        let (l, r) = (lhs.to_int()?, rhs.to_int()?);
        if r == 0 {
            return Err(error!(DivisionByZero));
        }
        Ok(Val::Integer(l.wrapping_div(r)))
    }

    pub fn modulo(lhs: Val, rhs: Val) -> Result<Val> {
        let (l, r) = (lhs.to_int()?, rhs.to_int()?);
        if r == 0 {
            return Err(error!(ModuloByZero));
        }
        Ok(Val::Integer(l.wrapping_rem(r)))
    }

    /// Integer power. Negative exponents truncate to zero except for
    /// bases of one and minus one. Zero has no negative power.
    pub fn power(lhs: Val, rhs: Val) -> Result<Val> {
        let (base, exp) = (lhs.to_int()?, rhs.to_int()?);
        let n = if exp < 0 {
            match base {
                0 => return Err(error!(OutOfRange; "exponentiation")),
                1 => 1,
                -1 => {
                    if exp % 2 == 0 {
                        1
                    } else {
                        -1
                    }
                }
                _ => 0,
            }
        } else {
            base.wrapping_pow(exp as u32)
        };
        Ok(Val::Integer(n))
    }

    pub fn negate(val: Val) -> Result<Val> {
        Ok(Val::Integer(val.to_int()?.wrapping_neg()))
    }

    pub fn not(val: Val) -> Result<Val> {
        Ok(Val::from(val.to_int()? == 0))
    }

    pub fn compare(lhs: Val, rhs: Val, op: fn(&i32, &i32) -> bool) -> Result<Val> {
        Ok(Val::from(op(&lhs.to_int()?, &rhs.to_int()?)))
    }

    pub fn equal(lhs: Val, rhs: Val) -> Result<Val> {
        let eq = match (&lhs, &rhs) {
            (Val::Integer(l), Val::Integer(r)) => l == r,
            (Val::String(l), Val::String(r)) => l == r,
            (Val::String(s), Val::Integer(n)) | (Val::Integer(n), Val::String(s)) => {
                string_to_num(s) == Some(*n)
            }
            _ => return Err(error!(TypeMismatch; "incompatible types to compare")),
        };
        Ok(Val::from(eq))
    }

    pub fn not_equal(lhs: Val, rhs: Val) -> Result<Val> {
        Operation::not(Operation::equal(lhs, rhs)?)
    }

    pub fn and(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from(lhs.to_bool()? && rhs.to_bool()?))
    }

    pub fn or(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from(lhs.to_bool()? || rhs.to_bool()?))
    }

    pub fn concat(lhs: Val, rhs: Val) -> Result<Val> {
        let mut s = lhs.to_str()?.to_string();
        s.push_str(&rhs.to_str()?);
        Ok(Val::from(s))
    }

    /// `key in array`, or with an array on the left, whether all of its
    /// keys are in the right.
    pub fn in_array(key: Val, array: Val) -> Result<Val> {
        let array = match array {
            Val::Array(a) => a,
            _ => return Err(error!(NotAnArray; "operator in on non-array")),
        };
        let found = match key {
            Val::Array(keys) => {
                Rc::ptr_eq(&keys, &array) || keys.borrow().is_subset_of(&array.borrow())
            }
            _ => array.borrow().contains_key(&key.to_str()?),
        };
        Ok(Val::from(found))
    }
}
