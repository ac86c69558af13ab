use hmsc_types::{AbiFunction, AbiParam};

/// Decodes `call_data`'s argument words against `function.param_types`,
/// assuming the standard ABI convention of one 32-byte word per static
/// parameter following the 4-byte selector. Dynamic types (`string`,
/// `bytes`, arrays) are not resolved; their word (an offset into the tail)
/// is rendered as hex rather than followed.
pub fn decode_params(function: &AbiFunction, call_data: &[u8]) -> Vec<AbiParam> {
    let body = call_data.get(4..).unwrap_or(&[]);

    function
        .param_types
        .iter()
        .enumerate()
        .map(|(index, type_name)| {
            let word = body.get(index * 32..index * 32 + 32);
            let value = match word {
                Some(word) => decode_word(type_name, word),
                None => "<truncated>".to_string(),
            };
            AbiParam {
                name: format!("arg{index}"),
                type_name: type_name.clone(),
                value,
            }
        })
        .collect()
}

fn decode_word(type_name: &str, word: &[u8]) -> String {
    if type_name == "address" {
        format!("0x{}", hex::encode(&word[12..]))
    } else if type_name == "bool" {
        if word.iter().any(|&b| b != 0) {
            "true".to_string()
        } else {
            "false".to_string()
        }
    } else if type_name.starts_with("uint") || type_name.starts_with("int") {
        if word[..16].iter().all(|&b| b == 0) {
            let mut buf = [0u8; 16];
            buf.copy_from_slice(&word[16..]);
            u128::from_be_bytes(buf).to_string()
        } else {
            format!("0x{}", hex::encode(word))
        }
    } else {
        format!("0x{}", hex::encode(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_static_word_types() {
        let function = AbiFunction {
            name: "transfer".into(),
            param_types: vec!["address".into(), "uint256".into(), "bool".into()],
        };

        let mut call_data = vec![0xde, 0xad, 0xbe, 0xef];
        let mut address_word = [0u8; 32];
        address_word[12..].copy_from_slice(&[0x11; 20]);
        call_data.extend_from_slice(&address_word);

        let mut amount_word = [0u8; 32];
        amount_word[31] = 42;
        call_data.extend_from_slice(&amount_word);

        call_data.extend_from_slice(&[0u8; 31]);
        call_data.push(1);

        let params = decode_params(&function, &call_data);
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].value, format!("0x{}", "11".repeat(20)));
        assert_eq!(params[1].value, "42");
        assert_eq!(params[2].value, "true");
    }

    #[test]
    fn truncated_call_data_is_reported_rather_than_panicking() {
        let function = AbiFunction {
            name: "noop".into(),
            param_types: vec!["uint256".into()],
        };
        let params = decode_params(&function, &[0u8; 4]);
        assert_eq!(params[0].value, "<truncated>");
    }
}
