//! 分块压缩的四维 f32 数组文件
//!
//! 文件布局（全部小端）：
//!
//! ```text
//! magic      8 字节  "SSWPARR\0"
//! version    u32
//! dtype      u8      1 = f32
//! level      u8      gzip 压缩级别
//! name_len   u16     + name (UTF-8)
//! shape      4 x u64
//! chunk      4 x u64
//! table      n_chunks x (offset u64, length u64)
//! payloads   每个分块单独 gzip 压缩，按 C 顺序存放该块实际范围内的值
//! ```
//!
//! 分块按分块网格的 C 顺序编号。边缘分块只保存实际范围，不做填充。

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use ndarray::{Array4, ArrayView3, ArrayView4, s};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

const MAGIC: &[u8; 8] = b"SSWPARR\0";
const VERSION: u32 = 1;
const DTYPE_F32: u8 = 1;
const AXES: [&str; 4] = ["dim0", "dim1", "dim2", "dim3"];

/// 最高 gzip 压缩级别
pub const MAX_COMPRESSION: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayHeader {
    /// 数据集名称，如 "Stats"
    pub name: String,
    pub shape: [usize; 4],
    pub chunk: [usize; 4],
    pub level: u32,
}

/// 分块在文件中的位置
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ChunkDescriptor {
    /// 压缩数据起始偏移（字节）
    pub offset: u64,
    /// 压缩后长度（字节）
    pub length: u64,
}

impl ArrayHeader {
    /// 每个维度上的分块数（向上取整）
    pub fn grid(&self) -> [usize; 4] {
        std::array::from_fn(|i| self.shape[i].div_ceil(self.chunk[i]))
    }

    pub fn num_chunks(&self) -> usize {
        self.grid().iter().product()
    }

    fn chunk_number(&self, coord: [usize; 4]) -> usize {
        let grid = self.grid();
        ((coord[0] * grid[1] + coord[1]) * grid[2] + coord[2]) * grid[3] + coord[3]
    }

    /// 分块的起点与实际范围
    fn chunk_extent(&self, coord: [usize; 4]) -> ([usize; 4], [usize; 4]) {
        let start: [usize; 4] = std::array::from_fn(|i| coord[i] * self.chunk[i]);
        let extent = std::array::from_fn(|i| self.chunk[i].min(self.shape[i] - start[i]));
        (start, extent)
    }

    fn encoded_len(&self) -> u64 {
        (MAGIC.len() + 4 + 1 + 1 + 2 + self.name.len() + 8 * 8) as u64
    }

    fn write_to(&self, out: &mut impl Write) -> std::io::Result<()> {
        out.write_all(MAGIC)?;
        out.write_u32::<LittleEndian>(VERSION)?;
        out.write_u8(DTYPE_F32)?;
        out.write_u8(self.level as u8)?;
        out.write_u16::<LittleEndian>(self.name.len() as u16)?;
        out.write_all(self.name.as_bytes())?;
        for dim in self.shape.iter().chain(self.chunk.iter()) {
            out.write_u64::<LittleEndian>(*dim as u64)?;
        }
        Ok(())
    }
}

/// 按首维逐行写入的分块数组
///
/// 每收满 `chunk[0]` 行就压缩输出这一行块内的所有分块，
/// 内存中只保留一个行块。分块表在 `finish` 时回填。
pub struct ChunkedArrayWriter {
    path: PathBuf,
    header: ArrayHeader,
    out: BufWriter<File>,
    table_pos: u64,
    cursor: u64,
    table: Vec<ChunkDescriptor>,
    pending: Vec<f32>,
    pending_rows: usize,
    rows_written: usize,
}

impl ChunkedArrayWriter {
    pub fn create(
        path: impl AsRef<Path>,
        name: &str,
        shape: [usize; 4],
        chunk: [usize; 4],
        level: u32,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if chunk.iter().any(|&c| c == 0) || shape.iter().any(|&d| d == 0) {
            return Err(Error::container(
                &path,
                format!("非法的形状 {:?} 或分块 {:?}", shape, chunk),
            ));
        }
        let header = ArrayHeader {
            name: name.to_string(),
            shape,
            chunk,
            level: level.min(MAX_COMPRESSION),
        };

        let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
        let mut out = BufWriter::new(file);
        let table = vec![ChunkDescriptor::default(); header.num_chunks()];
        let table_pos = header.encoded_len();
        let write_header = |out: &mut BufWriter<File>| -> std::io::Result<()> {
            header.write_to(out)?;
            // 先写占位的分块表
            for _ in 0..table.len() {
                out.write_u64::<LittleEndian>(0)?;
                out.write_u64::<LittleEndian>(0)?;
            }
            Ok(())
        };
        write_header(&mut out).map_err(|e| Error::io(&path, e))?;
        let cursor = table_pos + 16 * table.len() as u64;

        debug!(
            "创建数组文件 {} ({}), shape {:?}, chunk {:?}, {} 个分块",
            path.display(),
            name,
            shape,
            chunk,
            table.len()
        );

        Ok(Self {
            path,
            header,
            out,
            table_pos,
            cursor,
            table,
            pending: Vec::new(),
            pending_rows: 0,
            rows_written: 0,
        })
    }

    pub fn header(&self) -> &ArrayHeader {
        &self.header
    }

    /// 已写入（含缓冲中）的首维行数
    pub fn rows(&self) -> usize {
        self.rows_written + self.pending_rows
    }

    /// 写入首维的下一行，形状必须为 `shape[1..]`
    pub fn write_row(&mut self, row: ArrayView3<f32>) -> Result<()> {
        let shape = self.header.shape;
        if row.shape() != &shape[1..] {
            return Err(Error::BadShape {
                key: self.header.name.clone(),
                expected: shape[1..].to_vec(),
                actual: row.shape().to_vec(),
            });
        }
        Error::check_index(AXES[0], self.rows(), shape[0])?;

        self.pending.extend(row.iter().copied());
        self.pending_rows += 1;
        if self.pending_rows == self.header.chunk[0] || self.rows() == shape[0] {
            self.flush_rows()?;
        }
        Ok(())
    }

    fn flush_rows(&mut self) -> Result<()> {
        let shape = self.header.shape;
        let chunk = self.header.chunk;
        let grid = self.header.grid();
        let block = ArrayView4::from_shape(
            (self.pending_rows, shape[1], shape[2], shape[3]),
            &self.pending,
        )
        .map_err(|e| Error::container(&self.path, e.to_string()))?;
        let c0 = self.rows_written / chunk[0];

        for c1 in 0..grid[1] {
            for c2 in 0..grid[2] {
                for c3 in 0..grid[3] {
                    let coord = [c0, c1, c2, c3];
                    let (start, extent) = self.header.chunk_extent(coord);
                    let view = block.slice(s![
                        ..,
                        start[1]..start[1] + extent[1],
                        start[2]..start[2] + extent[2],
                        start[3]..start[3] + extent[3]
                    ]);

                    let mut encoder =
                        GzEncoder::new(Vec::new(), Compression::new(self.header.level));
                    let encoded = view
                        .iter()
                        .try_for_each(|v| encoder.write_f32::<LittleEndian>(*v))
                        .and_then(|_| encoder.finish())
                        .map_err(|e| Error::io(&self.path, e))?;

                    self.out
                        .write_all(&encoded)
                        .map_err(|e| Error::io(&self.path, e))?;
                    let number = self.header.chunk_number(coord);
                    self.table[number] = ChunkDescriptor {
                        offset: self.cursor,
                        length: encoded.len() as u64,
                    };
                    self.cursor += encoded.len() as u64;
                }
            }
        }

        self.rows_written += self.pending_rows;
        self.pending_rows = 0;
        self.pending.clear();
        Ok(())
    }

    /// 回填分块表并关闭文件，行数不足时报错
    pub fn finish(mut self) -> Result<ArrayHeader> {
        if self.rows_written != self.header.shape[0] {
            return Err(Error::container(
                &self.path,
                format!(
                    "只写入了 {} / {} 行",
                    self.rows_written, self.header.shape[0]
                ),
            ));
        }
        let table_pos = self.table_pos;
        let table = std::mem::take(&mut self.table);
        let out = &mut self.out;
        let result = (|| -> std::io::Result<()> {
            out.seek(SeekFrom::Start(table_pos))?;
            for descriptor in &table {
                out.write_u64::<LittleEndian>(descriptor.offset)?;
                out.write_u64::<LittleEndian>(descriptor.length)?;
            }
            out.flush()
        })();
        result.map_err(|e| Error::io(&self.path, e))?;
        Ok(self.header)
    }
}

/// 只读的分块数组文件
///
/// `open` 只解析文件头和分块表；每次读取都重新打开文件，读完即关闭。
#[derive(Debug, Clone)]
pub struct ChunkedArrayReader {
    path: PathBuf,
    header: ArrayHeader,
    table: Vec<ChunkDescriptor>,
}

impl ChunkedArrayReader {
    /// 打开文件并确认其中的数据集名为 `dataset`
    pub fn open(path: impl AsRef<Path>, dataset: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        let mut input = BufReader::new(file);

        let mut magic = [0u8; 8];
        input
            .read_exact(&mut magic)
            .map_err(|e| Error::io(&path, e))?;
        if &magic != MAGIC {
            return Err(Error::container(&path, "magic 不匹配"));
        }

        let (header, table) =
            Self::read_header(&mut input, &path).map_err(|e| Error::io(&path, e))??;
        if header.name != dataset {
            return Err(Error::MissingKey {
                path,
                key: dataset.to_string(),
            });
        }
        Ok(Self {
            path,
            header,
            table,
        })
    }

    /// 外层 Result 是 IO 错误，内层是格式错误
    #[allow(clippy::type_complexity)]
    fn read_header(
        input: &mut impl Read,
        path: &Path,
    ) -> std::io::Result<Result<(ArrayHeader, Vec<ChunkDescriptor>)>> {
        let version = input.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Ok(Err(Error::container(
                path,
                format!("不支持的版本 {}", version),
            )));
        }
        let dtype = input.read_u8()?;
        if dtype != DTYPE_F32 {
            return Ok(Err(Error::container(
                path,
                format!("不支持的数据类型 {}", dtype),
            )));
        }
        let level = input.read_u8()? as u32;
        let name_len = input.read_u16::<LittleEndian>()? as usize;
        let mut name = vec![0u8; name_len];
        input.read_exact(&mut name)?;
        let Ok(name) = String::from_utf8(name) else {
            return Ok(Err(Error::container(path, "数据集名称不是 UTF-8")));
        };

        let mut dims = [0usize; 8];
        for dim in dims.iter_mut() {
            *dim = input.read_u64::<LittleEndian>()? as usize;
        }
        let shape: [usize; 4] = std::array::from_fn(|i| dims[i]);
        let chunk: [usize; 4] = std::array::from_fn(|i| dims[4 + i]);
        if chunk.iter().any(|&c| c == 0) {
            return Ok(Err(Error::container(
                path,
                format!("非法的分块形状 {:?}", chunk),
            )));
        }

        let header = ArrayHeader {
            name,
            shape,
            chunk,
            level,
        };
        let mut table = Vec::with_capacity(header.num_chunks());
        for _ in 0..header.num_chunks() {
            table.push(ChunkDescriptor {
                offset: input.read_u64::<LittleEndian>()?,
                length: input.read_u64::<LittleEndian>()?,
            });
        }
        Ok(Ok((header, table)))
    }

    pub fn header(&self) -> &ArrayHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_chunk(&self, file: &mut File, coord: [usize; 4]) -> Result<Array4<f32>> {
        let descriptor = self.table[self.header.chunk_number(coord)];
        let (_, extent) = self.header.chunk_extent(coord);

        let mut compressed = vec![0u8; descriptor.length as usize];
        file.seek(SeekFrom::Start(descriptor.offset))
            .and_then(|_| file.read_exact(&mut compressed))
            .map_err(|e| Error::io(&self.path, e))?;

        let mut values = vec![0f32; extent.iter().product()];
        GzDecoder::new(&compressed[..])
            .read_f32_into::<LittleEndian>(&mut values)
            .map_err(|e| Error::io(&self.path, e))?;

        Array4::from_shape_vec(extent, values)
            .map_err(|e| Error::container(&self.path, e.to_string()))
    }

    /// 读取起点为 `start`、大小为 `count` 的超立方切片，只解码与之相交的分块
    pub fn read_block(&self, start: [usize; 4], count: [usize; 4]) -> Result<Array4<f32>> {
        let shape = self.header.shape;
        let chunk = self.header.chunk;
        for axis in 0..4 {
            Error::check_index(AXES[axis], start[axis], shape[axis])?;
            if count[axis] == 0 || start[axis] + count[axis] > shape[axis] {
                return Err(Error::IndexOutOfRange {
                    axis: AXES[axis],
                    index: start[axis] + count[axis],
                    len: shape[axis] + 1,
                });
            }
        }

        let first: [usize; 4] = std::array::from_fn(|i| start[i] / chunk[i]);
        let last: [usize; 4] = std::array::from_fn(|i| (start[i] + count[i] - 1) / chunk[i]);
        let end: [usize; 4] = std::array::from_fn(|i| start[i] + count[i]);

        let mut out = Array4::<f32>::zeros(count);
        let mut file = File::open(&self.path).map_err(|e| Error::io(&self.path, e))?;

        for c0 in first[0]..=last[0] {
            for c1 in first[1]..=last[1] {
                for c2 in first[2]..=last[2] {
                    for c3 in first[3]..=last[3] {
                        let coord = [c0, c1, c2, c3];
                        let data = self.read_chunk(&mut file, coord)?;
                        let (cstart, extent) = self.header.chunk_extent(coord);
                        let lo: [usize; 4] = std::array::from_fn(|i| start[i].max(cstart[i]));
                        let hi: [usize; 4] =
                            std::array::from_fn(|i| end[i].min(cstart[i] + extent[i]));

                        let src = data.slice(s![
                            lo[0] - cstart[0]..hi[0] - cstart[0],
                            lo[1] - cstart[1]..hi[1] - cstart[1],
                            lo[2] - cstart[2]..hi[2] - cstart[2],
                            lo[3] - cstart[3]..hi[3] - cstart[3]
                        ]);
                        out.slice_mut(s![
                            lo[0] - start[0]..hi[0] - start[0],
                            lo[1] - start[1]..hi[1] - start[1],
                            lo[2] - start[2]..hi[2] - start[2],
                            lo[3] - start[3]..hi[3] - start[3]
                        ])
                        .assign(&src);
                    }
                }
            }
        }
        Ok(out)
    }

    /// 读取整个数组
    pub fn read_all(&self) -> Result<Array4<f32>> {
        self.read_block([0; 4], self.header.shape)
    }
}
