//! Message ⇄ VM 4-tuple `(data, destination, currency, token operand)`.

use crate::codec::token_type::{token_type_from_operand, token_type_to_operand};
use crate::config::MESSAGE_TUPLE_SIZE;
use crate::errors::{CodecError, CodecResult};
use crate::types::{Message, Value};

/// Decode a message tuple. Elements 1..=3 must be integers; element 0 is opaque.
pub fn decode_message(value: &Value) -> CodecResult<Message> {
    let elements = value.as_tuple().ok_or(CodecError::NotATuple)?;
    if elements.len() != MESSAGE_TUPLE_SIZE {
        return Err(CodecError::WrongArity(elements.len()));
    }
    let destination = *elements[1]
        .as_int()
        .ok_or(CodecError::NotAnInteger("destination"))?;
    let currency = *elements[2]
        .as_int()
        .ok_or(CodecError::NotAnInteger("currency"))?;
    let token = elements[3]
        .as_int()
        .map(token_type_from_operand)
        .ok_or(CodecError::NotAnInteger("token_type"))?;

    Ok(Message {
        data: elements[0].clone(),
        destination,
        currency,
        token,
    })
}

#[must_use]
pub fn encode_message(message: &Message) -> Value {
    Value::Tuple(vec![
        message.data.clone(),
        Value::Int(message.destination),
        Value::Int(message.currency),
        Value::Int(token_type_to_operand(&message.token)),
    ])
}

impl Message {
    pub fn from_value(value: &Value) -> CodecResult<Self> {
        decode_message(value)
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        encode_message(self)
    }
}
