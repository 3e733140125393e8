//! Reserved opcode space and the extension convention.
//!
//! The transport reserves a small set of control codes. Application opcode
//! tables start at [`FIRST_FREE_OPCODE`] and are assigned via [`opcode_id`],
//! so multiple independent tables can be layered without collision:
//!
//! ```
//! use framecast::protocol::opcode;
//!
//! const MY_LOGIN: i32 = opcode::opcode_id(0);
//! const MY_CHAT: i32 = opcode::opcode_id(1);
//! assert!(MY_LOGIN >= opcode::FIRST_FREE_OPCODE);
//! ```

/// Does nothing; safe to send as padding or a probe.
pub const NOOP: i32 = 0;

/// Keep-alive packet; consumed by the session, never dispatched.
pub const HEARTBEAT: i32 = 1;

/// File transfer payload.
pub const SEND_FILE: i32 = 2;

/// Peer requests an orderly disconnect.
pub const DISCONNECT_REQUEST: i32 = 3;

/// Acknowledges a disconnect request.
pub const DISCONNECT_ACK: i32 = 4;

/// Application-level entity diff.
pub const ENTITY_UPDATE: i32 = 5;

/// Liveness probe; the session answers with [`PONG`] when no application
/// handler claims it.
pub const PING: i32 = 6;

/// Answer to [`PING`].
pub const PONG: i32 = 7;

/// Peer asks for a file by name.
pub const REQUEST_FILE: i32 = 8;

/// First opcode available to application tables.
pub const FIRST_FREE_OPCODE: i32 = 100;

/// Map an application table index to a wire opcode.
pub const fn opcode_id(index: i32) -> i32 {
    FIRST_FREE_OPCODE + index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_id_offsets_from_sentinel() {
        assert_eq!(opcode_id(0), FIRST_FREE_OPCODE);
        assert_eq!(opcode_id(5), FIRST_FREE_OPCODE + 5);
    }

    #[test]
    fn test_reserved_codes_below_sentinel() {
        for code in [
            NOOP,
            HEARTBEAT,
            SEND_FILE,
            DISCONNECT_REQUEST,
            DISCONNECT_ACK,
            ENTITY_UPDATE,
            PING,
            PONG,
            REQUEST_FILE,
        ] {
            assert!(code < FIRST_FREE_OPCODE);
        }
    }

    #[test]
    fn test_reserved_codes_distinct() {
        let codes = [
            NOOP,
            HEARTBEAT,
            SEND_FILE,
            DISCONNECT_REQUEST,
            DISCONNECT_ACK,
            ENTITY_UPDATE,
            PING,
            PONG,
            REQUEST_FILE,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
