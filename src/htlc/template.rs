use bitcoin::opcodes::Opcode;
use bitcoin::opcodes::all::*;
use bitcoin::script::{Instruction, Script};

use super::SwapScriptKind;

/// A decompiled script element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptElement {
    Opcode(u8),
    Push(Vec<u8>),
}

/// One position of a script template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSlot {
    Opcode(u8),
    /// Any data push of at least this many bytes.
    AnyBufferMinLen(usize),
    ExactBytes(Vec<u8>),
    /// A lock time as `push_lock_time` emits it: `OP_1`..`OP_16` or a 1 to 5 byte push.
    ScriptNum,
}

impl TemplateSlot {
    fn matches(&self, element: &ScriptElement) -> bool {
        match (self, element) {
            (TemplateSlot::Opcode(want), ScriptElement::Opcode(got)) => want == got,
            (TemplateSlot::AnyBufferMinLen(min), ScriptElement::Push(data)) => data.len() >= *min,
            (TemplateSlot::ExactBytes(want), ScriptElement::Push(data)) => want == data,
            (TemplateSlot::ScriptNum, ScriptElement::Opcode(op)) => small_int(*op).is_some(),
            (TemplateSlot::ScriptNum, ScriptElement::Push(data)) => {
                (1..=MAX_SCRIPT_NUM_LEN).contains(&data.len())
            }
            _ => false,
        }
    }
}

const PUBKEY_LEN: usize = 33;
const XONLY_PUBKEY_LEN: usize = 32;
const HASH160_LEN: usize = 20;
const MAX_SCRIPT_NUM_LEN: usize = 5;

/// Value of an `OP_1`..`OP_16` opcode.
pub fn small_int(opcode: u8) -> Option<u8> {
    let first = OP_PUSHNUM_1.to_u8();
    let last = OP_PUSHNUM_16.to_u8();
    (first..=last).contains(&opcode).then(|| opcode - first + 1)
}

/// Splits a script into opcodes and pushes; `None` if a push runs past the end.
pub fn decompile(script: &Script) -> Option<Vec<ScriptElement>> {
    script
        .instructions()
        .map(|ins| match ins.ok()? {
            Instruction::Op(op) => Some(ScriptElement::Opcode(op.to_u8())),
            Instruction::PushBytes(bytes) => Some(ScriptElement::Push(bytes.as_bytes().to_vec())),
        })
        .collect()
}

pub fn is_script_matching_template(script: &Script, template: &[TemplateSlot]) -> bool {
    let Some(elements) = decompile(script) else {
        return false;
    };
    elements.len() == template.len()
        && template
            .iter()
            .zip(elements.iter())
            .all(|(slot, element)| slot.matches(element))
}

fn op(opcode: Opcode) -> TemplateSlot {
    TemplateSlot::Opcode(opcode.to_u8())
}

fn preimage_size() -> TemplateSlot {
    TemplateSlot::ExactBytes(vec![super::PREIMAGE_LEN as u8])
}

pub fn v1_template() -> Vec<TemplateSlot> {
    vec![
        op(OP_SIZE),
        preimage_size(),
        op(OP_EQUAL),
        op(OP_IF),
        op(OP_HASH160),
        TemplateSlot::AnyBufferMinLen(HASH160_LEN),
        op(OP_EQUALVERIFY),
        TemplateSlot::AnyBufferMinLen(PUBKEY_LEN),
        op(OP_ELSE),
        op(OP_DROP),
        TemplateSlot::ScriptNum,
        op(OP_CLTV),
        op(OP_DROP),
        TemplateSlot::AnyBufferMinLen(PUBKEY_LEN),
        op(OP_ENDIF),
        op(OP_CHECKSIG),
    ]
}

pub fn v2_template() -> Vec<TemplateSlot> {
    vec![
        TemplateSlot::AnyBufferMinLen(PUBKEY_LEN),
        op(OP_CHECKSIG),
        op(OP_NOTIF),
        op(OP_DUP),
        op(OP_HASH160),
        TemplateSlot::AnyBufferMinLen(HASH160_LEN),
        op(OP_EQUALVERIFY),
        op(OP_CHECKSIGVERIFY),
        TemplateSlot::ScriptNum,
        op(OP_CLTV),
        op(OP_ELSE),
        op(OP_SIZE),
        preimage_size(),
        op(OP_EQUALVERIFY),
        op(OP_HASH160),
        TemplateSlot::AnyBufferMinLen(HASH160_LEN),
        op(OP_EQUALVERIFY),
        op(OP_PUSHNUM_1),
        op(OP_CSV),
        op(OP_ENDIF),
    ]
}

pub fn taproot_claim_template() -> Vec<TemplateSlot> {
    vec![
        TemplateSlot::AnyBufferMinLen(XONLY_PUBKEY_LEN),
        op(OP_CHECKSIGVERIFY),
        op(OP_SIZE),
        preimage_size(),
        op(OP_EQUALVERIFY),
        op(OP_HASH160),
        TemplateSlot::AnyBufferMinLen(HASH160_LEN),
        op(OP_EQUALVERIFY),
        op(OP_PUSHNUM_1),
        op(OP_CSV),
    ]
}

pub fn taproot_refund_template() -> Vec<TemplateSlot> {
    vec![
        TemplateSlot::AnyBufferMinLen(XONLY_PUBKEY_LEN),
        op(OP_CHECKSIGVERIFY),
        TemplateSlot::ScriptNum,
        op(OP_CLTV),
    ]
}

/// Generation of a legacy (P2WSH) swap script: `V1`, `V2` or `None`.
pub fn script_version(script: &Script) -> Option<SwapScriptKind> {
    if is_script_matching_template(script, &v1_template()) {
        Some(SwapScriptKind::V1)
    } else if is_script_matching_template(script, &v2_template()) {
        Some(SwapScriptKind::V2)
    } else {
        None
    }
}

/// Which Taproot swap leaf `script` is, if any.
pub fn taproot_leaf_kind(script: &Script) -> Option<SwapScriptKind> {
    if is_script_matching_template(script, &taproot_claim_template()) {
        Some(SwapScriptKind::TaprootClaim)
    } else if is_script_matching_template(script, &taproot_refund_template()) {
        Some(SwapScriptKind::TaprootRefund)
    } else {
        None
    }
}
